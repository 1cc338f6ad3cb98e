//! Authorize against the social API from a terminal and post one status.
//!
//! Usage: `shopfront-post <status text...>`
//!
//! Prints the authorization URL, then reads the `code` (and optionally the
//! `state`) from the redirect the browser lands on. Pasting the whole redirect
//! URL also works.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use shopfront::config::SocialConfig;
use shopfront::social::Authorizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        return Err("usage: shopfront-post <status text>".into());
    }

    let config = SocialConfig::from_env()?
        .ok_or("SHOPFRONT_SOCIAL_CLIENT_ID is not set")?;
    let authorizer = Authorizer::new(&config)?;
    let challenge = authorizer.begin_authorization()?;

    println!("Open this URL and approve access:\n\n{}\n", challenge.authorization_url);
    println!("Paste the redirect URL (or just the code):");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let (code, returned_state) = parse_redirect(line.trim());

    let client = match returned_state {
        Some(state) => authorizer.complete_with_state(challenge, &state, &code).await?,
        None => authorizer.complete_authorization(challenge, &code).await?,
    };

    let posted = client.post_status(&text).await?;
    println!("Posted status {}", posted.id);
    Ok(())
}

/// Accepts either a bare code or the full redirect URL.
fn parse_redirect(input: &str) -> (String, Option<String>) {
    let Ok(url) = Url::parse(input) else {
        return (input.to_string(), None);
    };
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    (code.unwrap_or_default(), state)
}

#[cfg(test)]
mod tests {
    use super::parse_redirect;

    #[test]
    fn bare_code_is_used_as_is() {
        assert_eq!(parse_redirect("abc123"), ("abc123".to_string(), None));
    }

    #[test]
    fn redirect_url_yields_code_and_state() {
        let (code, state) =
            parse_redirect("http://localhost:3000/callback?state=s1&code=c%2F1");
        assert_eq!(code, "c/1");
        assert_eq!(state.as_deref(), Some("s1"));
    }
}
