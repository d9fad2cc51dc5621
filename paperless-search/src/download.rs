//! Document download
//!
//! `GET /api/documents/{id}/download/` returns the original file. The local
//! file name comes from the `Content-Disposition` header: the RFC 5987
//! `filename*=` parameter is preferred, then `filename=`. Spaces become `_`
//! and path separators are removed so the name cannot escape the download
//! directory. Without a usable name the file is saved as
//! `paperless_download.pdf`.
//!
//! The body is streamed to disk chunk by chunk. If the transfer fails, the
//! partial file is removed.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use snafu::prelude::*;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::{
    Result,
    client::PaperlessClient,
    config::DOWNLOAD_FALLBACK_NAME,
    documents::download_url,
    error::{HttpSnafu, IoSnafu},
    http_client::HttpRequest,
};

impl PaperlessClient {
    /// Downloads the original file of document `id` into `dir`, creating `dir`
    /// if needed. Returns the path of the saved file. An existing file with the
    /// same name is overwritten.
    pub async fn download(&self, id: u64, dir: &Path) -> Result<PathBuf> {
        let request = HttpRequest::get(download_url(self.base_url(), id));
        let response = self.client.execute(&request).await?;
        let header = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok());
        let path = dir.join(filename_from_disposition(header));

        tokio::fs::create_dir_all(dir)
            .await
            .context(IoSnafu { path: dir })?;
        let mut file = tokio::fs::File::create(&path)
            .await
            .context(IoSnafu { path: &path })?;

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        let result: Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.context(HttpSnafu {
                    method: "GET",
                    url: request.url.clone(),
                })?;
                self.client.metrics.add_bytes_received(chunk.len() as u64);
                written += chunk.len() as u64;
                file.write_all(&chunk).await.context(IoSnafu { path: &path })?;
            }
            file.flush().await.context(IoSnafu { path: &path })
        }
        .await;

        if let Err(err) = result {
            drop(file);
            if let Err(delete_err) = tokio::fs::remove_file(&path).await {
                error!(
                    "failed to remove incomplete download {path:?} (err={delete_err}) after download error {err}"
                );
            }
            return Err(err);
        }
        info!(id, path = %path.display(), bytes = written, "downloaded document");
        Ok(path)
    }
}

/// Local file name for a download, from the value of a `Content-Disposition` header.
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .and_then(parse_disposition)
        .and_then(|name| sanitize_filename(&name))
        .unwrap_or_else(|| DOWNLOAD_FALLBACK_NAME.to_string())
}

// returns the filename* value if present and decodable, otherwise the filename value
fn parse_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_ext_value(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }
    extended.or(plain)
}

// splits on `;` outside of quoted strings
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, ch) in header.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(header[start..].trim());
    params
}

// strips surrounding quotes and backslash escapes from a quoted-string
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .map(|rest| rest.strip_suffix('"').unwrap_or(rest))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

// RFC 5987 ext-value: charset'language'percent-encoded-value
fn decode_ext_value(value: &str) -> Option<String> {
    let encoded = match value.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
        [_charset, _lang, encoded] => *encoded,
        _ => value,
    };
    Some(
        percent_decode_str(encoded.trim_matches('"'))
            .decode_utf8_lossy()
            .into_owned(),
    )
}

fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .chars()
        .filter(|ch| !matches!(ch, '/' | '\\' | '\0'))
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filename() {
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="Invoice March.pdf""#)),
            "Invoice_March.pdf"
        );
    }

    #[test]
    fn test_extended_filename_preferred() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=utf-8''Rechnung%20M%C3%A4rz.pdf"#;
        assert_eq!(filename_from_disposition(Some(header)), "Rechnung_März.pdf");
    }

    #[test]
    fn test_separators_stripped() {
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="../../etc/passwd""#)),
            "etcpasswd"
        );
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="a\b.pdf""#)),
            "ab.pdf"
        );
    }

    #[test]
    fn test_quoted_semicolon_and_escapes() {
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="Lease; signed.pdf"; size=42"#)),
            "Lease;_signed.pdf"
        );
        assert_eq!(
            filename_from_disposition(Some(r#"inline; filename="say \"hi\"; now.pdf""#)),
            "say_\"hi\";_now.pdf"
        );
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(filename_from_disposition(None), DOWNLOAD_FALLBACK_NAME);
        assert_eq!(
            filename_from_disposition(Some("attachment")),
            DOWNLOAD_FALLBACK_NAME
        );
        assert_eq!(
            filename_from_disposition(Some(r#"attachment; filename="""#)),
            DOWNLOAD_FALLBACK_NAME
        );
    }
}
