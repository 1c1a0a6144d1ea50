use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

/// Writes `m` to the controlling terminal (or stderr), never to stdout.
pub async fn send(m: &str) {
    let s = if m.ends_with("\n") {
        m.to_owned()
    } else {
        format!("{m}\n")
    };
    print(&s).await;
}

async fn print(s: &str) {
    let mut output = output();
    if let Err(e) = write(&mut output, s.as_bytes()).await {
        tracing::warn!("Failed to write to terminal: {e}; {}", s);
    }
}

async fn write(output: &mut Output, s: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    output.write_all(s).await?;
    output.flush().await?;
    Ok(())
}

/// Prompts with `label` and reads one non-empty line from stdin.
pub async fn read_line(label: &str) -> crate::Result<String> {
    loop {
        prompt(label).await;
        let line = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin().read_line(&mut buf).map(|n| (n, buf))
        })
        .await
        .map_err(|e| crate::Error::UserError(format!("Failed to read input: {e}")))??;
        match line {
            (0, _) => {
                return Err(crate::Error::UserError(format!(
                    "input closed while waiting for {label}"
                )))
            }
            (_, s) if s.trim().is_empty() => continue,
            (_, s) => return Ok(s.trim().to_owned()),
        }
    }
}

/// Prompts with `label` and reads a line without echoing it.
pub async fn read_secret(label: &str) -> crate::Result<secrecy::SecretString> {
    let label = format!("{label}: ");
    loop {
        let label = label.clone();
        let value = tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
            .await
            .map_err(|e| crate::Error::UserError(format!("Failed to read input: {e}")))??;
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.into());
        }
    }
}

async fn prompt(label: &str) {
    print(&format!("{label}: ")).await;
}

/// [`crate::role::RoleChooser`] reading the answer from the terminal.
#[derive(Debug, Default)]
pub struct TerminalChooser;

impl crate::role::RoleChooser for TerminalChooser {
    async fn choose(&mut self, menu: &str) -> crate::Result<String> {
        print(menu).await;
        read_line("Selection").await
    }
}

#[pin_project::pin_project(project = OutputProj)]
#[derive(Debug)]
enum Output {
    File(#[pin] tokio::fs::File),
    Stderr(#[pin] tokio::io::Stderr),
}

fn output() -> Output {
    let fd = std::fs::OpenOptions::new()
        .append(true)
        .open("/dev/tty")
        .ok()
        .map(tokio::fs::File::from_std);
    match fd {
        Some(file) => Output::File(file),
        None => Output::Stderr(tokio::io::stderr()),
    }
}

impl tokio::io::AsyncWrite for Output {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.project();
        match this {
            OutputProj::File(f) => tokio::io::AsyncWrite::poll_write(f, cx, buf),
            OutputProj::Stderr(f) => tokio::io::AsyncWrite::poll_write(f, cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        let this = self.project();
        match this {
            OutputProj::File(f) => tokio::io::AsyncWrite::poll_flush(f, cx),
            OutputProj::Stderr(f) => tokio::io::AsyncWrite::poll_flush(f, cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        let this = self.project();
        match this {
            OutputProj::File(f) => tokio::io::AsyncWrite::poll_shutdown(f, cx),
            OutputProj::Stderr(f) => tokio::io::AsyncWrite::poll_shutdown(f, cx),
        }
    }
}
