use crate::session::LoginForm;
use crate::shell::{ShellError, SurfaceBackend, WindowSpec};
use std::io::{self, BufRead, Write};
use url::Url;

/// Renders the shell on the terminal. The remote surface opens in the system browser.
pub struct TerminalBackend {
    open_browser: bool,
}

impl TerminalBackend {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

impl SurfaceBackend for TerminalBackend {
    fn open_window(&mut self, spec: &WindowSpec) -> Result<(), ShellError> {
        println!("🎮 {} ({}x{})", spec.title, spec.width, spec.height);
        Ok(())
    }

    fn render_login(&mut self, prefill: &LoginForm) -> Result<(), ShellError> {
        if prefill.user_email.is_empty() {
            println!("Sign in to {}", prefill.server_url);
        } else {
            println!("Sign in to {} as {}", prefill.server_url, prefill.user_email);
        }
        Ok(())
    }

    fn render_remote(&mut self, url: &Url) -> Result<(), ShellError> {
        if self.open_browser {
            open::that(url.as_str()).map_err(|err| ShellError::LoadFailed {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        }
        println!("🏰 Game ready: {url}");
        Ok(())
    }

    fn toast(&mut self, message: &str, succeeded: bool) {
        if succeeded {
            println!("✅ {message}");
        } else {
            eprintln!("⚠️  {message}");
        }
    }

    fn loading(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            println!("⏳ {message}");
        }
    }
}

/// Prompts for a single line, returning `default` on empty input.
pub fn prompt_line(label: &str, default: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    if default.is_empty() {
        write!(stdout, "{label}: ")?;
    } else {
        write!(stdout, "{label} [{default}]: ")?;
    }
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}

/// Fills in whatever the caller did not provide, starting from the stored prefill.
pub fn prompt_login(
    prefill: &LoginForm,
    user_email: Option<String>,
    server_url: Option<String>,
) -> io::Result<LoginForm> {
    let user_email = match user_email {
        Some(email) => email,
        None => prompt_line("E-mail", &prefill.user_email)?,
    };
    let server_url = match server_url {
        Some(url) => url,
        None => prompt_line("Server URL", &prefill.server_url)?,
    };

    let reuse_cached = !prefill.user_password.is_empty()
        && user_email == prefill.user_email
        && server_url == prefill.server_url;
    let label = if reuse_cached {
        "Password (blank keeps the saved one): "
    } else {
        "Password: "
    };
    let typed = rpassword::prompt_password(label)?;
    let user_password = if typed.is_empty() && reuse_cached {
        prefill.user_password.clone()
    } else {
        typed
    };

    Ok(LoginForm {
        user_email,
        user_password,
        server_url,
    })
}
