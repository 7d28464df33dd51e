use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, Password, Text};

use crate::api::ApiClient;
use crate::api::auth::{AuthApi, decode_captcha_image};
use crate::auth::AuthStore;
use crate::cli::AuthCommands;
use crate::config::Config;

pub fn run(command: AuthCommands) -> Result<()> {
    let config = Config::load_or_default();
    let client = super::api_client(&config, super::transport());

    match command {
        AuthCommands::Login { email } => login(client, email),
        AuthCommands::Register { email } => register(client, email),
        AuthCommands::Logout => {
            let mut store = AuthStore::new(client);
            if !store.is_authenticated() {
                println!("{}", "Not signed in".dimmed());
                return Ok(());
            }
            store.logout();
            println!("{}", "Signed out".green());
            Ok(())
        }
        AuthCommands::Status => {
            let store = AuthStore::new(client);
            match store.user() {
                Some(user) => {
                    println!("{} {}", "Signed in as".green(), user.email.bold());
                    println!("  {}  {}", "id".dimmed(), user.id);
                    println!("  {}  {}", "status".dimmed(), user.status);
                    if let Some(last) = user.last_login_at {
                        println!("  {}  {last}", "last login".dimmed());
                    }
                }
                None => println!("{}", "Not signed in".dimmed()),
            }
            Ok(())
        }
        AuthCommands::Refresh => {
            let mut store = AuthStore::new(client);
            if store.user().is_none() {
                anyhow::bail!("Not signed in. Run `pptdeck auth login` first.");
            }
            store
                .refresh_token()
                .context("Session refresh failed, please log in again")?;
            println!("{}", "Session refreshed".green());
            Ok(())
        }
    }
}

fn prompt_email(email: Option<String>) -> Result<String> {
    let email = match email {
        Some(e) => e,
        None => Text::new("Email:").prompt()?,
    };
    let email = email.trim().to_string();
    if !email.contains('@') {
        anyhow::bail!("Invalid email: {email}");
    }
    Ok(email)
}

fn login(client: ApiClient, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let password = Password::new("Password:")
        .without_confirmation()
        .prompt()?;

    let mut store = AuthStore::new(client);
    match store.login(&email, &password) {
        Ok(response) => {
            println!("{} {}", "Signed in as".green(), response.user.email.bold());
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Login error: {e}");
            anyhow::bail!("{}", store.error().unwrap_or("Login failed"))
        }
    }
}

/// Captcha, then emailed code, then password.
fn register(client: ApiClient, email: Option<String>) -> Result<()> {
    let email = prompt_email(email)?;
    let api = AuthApi::new(&client);

    loop {
        let captcha = api.captcha().map_err(super::user_error)?;
        let image = decode_captcha_image(&captcha.image).context("Captcha image is not valid base64")?;
        let path = captcha_path();
        std::fs::write(&path, image)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Captcha image saved to {}", path.display().to_string().bold());

        let code = Text::new("Captcha:").prompt()?;
        match api.send_verification_code(&email, &captcha.captcha_id, code.trim()) {
            Ok(sent) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::debug!("Could not remove {}: {e}", path.display());
                }
                if sent.expires_in > 0 {
                    println!(
                        "Verification code sent to {email} (valid for {} minutes)",
                        sent.expires_in.div_ceil(60)
                    );
                } else {
                    println!("Verification code sent to {email}");
                }
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "Captcha rejected:".yellow(), e.user_message());
                if !Confirm::new("Try another captcha?")
                    .with_default(true)
                    .prompt()?
                {
                    anyhow::bail!("Registration cancelled");
                }
            }
        }
    }

    let email_code = Text::new("Email code:").prompt()?;
    let password = Password::new("Password:").prompt()?;

    let mut store = AuthStore::new(client.clone());
    match store.register(&email, &password, email_code.trim()) {
        Ok(response) => {
            println!(
                "{} {}",
                "Registered and signed in as".green(),
                response.user.email.bold()
            );
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Registration error: {e}");
            anyhow::bail!("{}", store.error().unwrap_or("Registration failed"))
        }
    }
}

fn captcha_path() -> PathBuf {
    std::env::temp_dir().join(format!("pptdeck-captcha-{}.png", std::process::id()))
}
