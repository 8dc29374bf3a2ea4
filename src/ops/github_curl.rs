use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Public GitHub GraphQL endpoint.
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// HTTP client using curl for posting GraphQL documents to GitHub
pub struct GithubCurlClient {
    token: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

impl GithubCurlClient {
    pub fn new(token: String, endpoint: String) -> Self {
        Self { token, endpoint }
    }

    /// POST a JSON body to the GraphQL endpoint and return the response body
    pub async fn post(&self, json_data: &str) -> Result<String> {
        let mut child = Command::new("curl")
            .args(curl_args(&self.endpoint, json_data))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to execute curl command")?;

        // The token goes through stdin so it never shows up in the process list
        let mut stdin = child.stdin.take().context("curl stdin was not captured")?;
        stdin
            .write_all(auth_header(&self.token).as_bytes())
            .await
            .context("Failed to pass the authorization header to curl")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }
}

fn auth_header(token: &str) -> String {
    format!("Authorization: bearer {}\n", token)
}

/// Arguments for one POST; `-H @-` makes curl read extra headers from stdin
fn curl_args<'a>(endpoint: &'a str, json_data: &'a str) -> Vec<&'a str> {
    vec![
        "-s",
        "-w",
        "\n%{http_code}",
        "-X",
        "POST",
        "-H",
        "@-",
        "-H",
        "Accept: application/json",
        "-H",
        "Content-Type: application/json",
        "-H",
        "User-Agent: update-nix-sources",
        "--data-binary",
        json_data,
        endpoint,
    ]
}

/// Split off the status code curl appends after the body and fail on HTTP errors
fn parse_response(stdout: Vec<u8>) -> Result<String> {
    let output_str = String::from_utf8(stdout)?;
    let (response, status) = output_str
        .rsplit_once('\n')
        .unwrap_or(("", output_str.as_str()));
    let status_code = status.trim().parse::<u16>().unwrap_or(0);

    if status_code == 0 || status_code >= 400 {
        // Try to parse error message from response
        if let Ok(error) = serde_json::from_str::<GitHubError>(response) {
            bail!("GitHub API error: {}", error.message);
        }
        bail!(
            "GitHub API request failed with status {}: {}",
            status_code,
            response
        );
    }

    Ok(response.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_not_passed_as_an_argument() {
        let client = GithubCurlClient::new(
            "ghp_secret".to_string(),
            GITHUB_GRAPHQL_URL.to_string(),
        );
        let args = curl_args(&client.endpoint, "{}");

        assert!(args.iter().all(|arg| !arg.contains("ghp_secret")));
        assert!(args.windows(2).any(|pair| pair == ["-H", "@-"]));
        assert_eq!(args.last(), Some(&GITHUB_GRAPHQL_URL));
        assert_eq!(auth_header(&client.token), "Authorization: bearer ghp_secret\n");
    }

    #[test]
    fn test_parse_response_ok() {
        let body = parse_response(b"{\"data\":{}}\n200".to_vec()).unwrap();
        assert_eq!(body, "{\"data\":{}}");
    }

    #[test]
    fn test_parse_response_keeps_multiline_body() {
        let body = parse_response(b"{\n\"data\": null\n}\n200".to_vec()).unwrap();
        assert_eq!(body, "{\n\"data\": null\n}");
    }

    #[test]
    fn test_parse_response_http_error_with_message() {
        let err = parse_response(b"{\"message\":\"Bad credentials\"}\n401".to_vec()).unwrap_err();
        assert_eq!(err.to_string(), "GitHub API error: Bad credentials");
    }

    #[test]
    fn test_parse_response_http_error_without_message() {
        let err = parse_response(b"<html>oops</html>\n502".to_vec()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GitHub API request failed with status 502: <html>oops</html>"
        );
    }

    #[test]
    fn test_parse_response_missing_status() {
        assert!(parse_response(b"".to_vec()).is_err());
    }
}
