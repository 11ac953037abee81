//! Login state commands.

use std::io::BufRead;

use chinchin_client::{ChinChinClient, RestoredSession};
use secrecy::SecretString;

use super::{CliError, print_line};

pub async fn login(
    client: &ChinChinClient,
    email: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    let profile = client
        .session()
        .login(email, &SecretString::from(password))
        .await?;

    let role = if profile.role.is_admin() { " (admin)" } else { "" };
    print_line(&format!("Signed in as {} <{}>{role}", profile.name, profile.email));
    Ok(())
}

pub async fn logout(client: &ChinChinClient) -> Result<(), Box<dyn std::error::Error>> {
    client.session().logout().await?;
    print_line("Signed out");
    Ok(())
}

pub async fn whoami(client: &ChinChinClient) -> Result<(), Box<dyn std::error::Error>> {
    match client.session().restore().await? {
        RestoredSession::Active(profile) => print_line(&format!(
            "{} <{}> role={}",
            profile.name,
            profile.email,
            if profile.role.is_admin() { "admin" } else { "user" }
        )),
        RestoredSession::Expired => print_line("Session expired"),
        RestoredSession::Anonymous => print_line("Not signed in"),
    }
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(CliError::PasswordRequired);
    }
    Ok(password)
}
