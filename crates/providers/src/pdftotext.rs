//! PDF text extraction via the poppler `pdftotext` binary.

use async_trait::async_trait;
use llmask_core::error::MediaError;
use llmask_core::media::TextExtractor;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Runs `pdftotext - -`, feeding the PDF on stdin and reading text from stdout.
pub struct PdfToText {
    program: String,
}

impl PdfToText {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

#[async_trait]
impl TextExtractor for PdfToText {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, MediaError> {
        let failed = |status: &str, stderr: String| MediaError::ExtractionFailed {
            status: status.to_string(),
            stderr,
        };

        let mut child = Command::new(&self.program)
            .args(["-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed("spawn failed", format!("{}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failed("spawn failed", "stdin not captured".into()))?;

        // Feed stdin while stdout is drained, so large documents cannot
        // deadlock on a full pipe.
        let input = pdf.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failed("wait failed", e.to_string()))?;

        match writer.await {
            Ok(Ok(())) => {}
            // A process that exits early closes its stdin; the exit status says why.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(failed("write failed", e.to_string())),
            Err(e) => return Err(failed("write failed", e.to_string())),
        }

        if !output.status.success() {
            return Err(failed(
                &output.status.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        debug!(bytes_in = pdf.len(), bytes_out = output.stdout.len(), "Extracted PDF text");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
