//! Token stream accumulation
//!
//! Streaming agents consume the provider's token stream through
//! [`accumulate`], which invokes the per-token callback for each chunk and
//! assembles the final message text. Cancellation is observed between
//! chunks; a cancelled stream returns the partial text accumulated so far,
//! flagged as cancelled, because the callback has already delivered that
//! prefix to the caller.

use super::provider::{ProviderError, TokenStream};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked once per streamed token
pub type TokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of draining a token stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedCompletion {
    /// Concatenation of every chunk seen before the stream ended
    pub text: String,
    /// True when the stream was cancelled before completion
    pub cancelled: bool,
}

/// Drain a token stream into a single completion
pub async fn accumulate(
    mut stream: TokenStream,
    callback: Option<&TokenCallback>,
    cancel: Option<&CancellationToken>,
) -> Result<StreamedCompletion, ProviderError> {
    let mut text = String::new();

    loop {
        let chunk = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Ok(StreamedCompletion {
                        text,
                        cancelled: true,
                    });
                }
                chunk = stream.next() => chunk,
            },
            None => stream.next().await,
        };

        match chunk {
            Some(Ok(token)) => {
                if let Some(cb) = callback {
                    cb(&token);
                }
                text.push_str(&token);
            }
            Some(Err(error)) => return Err(error),
            None => break,
        }
    }

    Ok(StreamedCompletion {
        text,
        cancelled: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn token_stream(tokens: Vec<&'static str>) -> TokenStream {
        futures::stream::iter(tokens.into_iter().map(|t| Ok(t.to_string()))).boxed()
    }

    #[tokio::test]
    async fn test_accumulates_all_tokens() {
        let stream = token_stream(vec!["Hel", "lo ", "world"]);
        let result = accumulate(stream, None, None).await.unwrap();
        assert_eq!(result.text, "Hello world");
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_callback_sees_every_chunk() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let callback: TokenCallback = Arc::new(move |token: &str| {
            seen_clone.lock().unwrap().push(token.to_string());
        });

        let stream = token_stream(vec!["a", "b", "c"]);
        let result = accumulate(stream, Some(&callback), None).await.unwrap();

        assert_eq!(result.text, "abc");
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let stream: TokenStream = futures::stream::iter(vec![
            Ok("partial".to_string()),
            Err(ProviderError::ModelError("boom".to_string())),
        ])
        .boxed();

        let result = accumulate(stream, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancellation_before_first_chunk_returns_empty() {
        let token = CancellationToken::new();
        token.cancel();

        let stream = token_stream(vec!["never", "seen"]);
        let result = accumulate(stream, None, Some(&token)).await.unwrap();

        assert!(result.cancelled);
        assert_eq!(result.text, "");
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream_keeps_prefix_and_stops_consumption() {
        let token = CancellationToken::new();
        let delivered: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        // Cancel from within the callback after the second chunk
        let delivered_clone = delivered.clone();
        let cancel_after_two = token.clone();
        let callback: TokenCallback = Arc::new(move |chunk: &str| {
            let mut seen = delivered_clone.lock().unwrap();
            seen.push(chunk.to_string());
            if seen.len() == 2 {
                cancel_after_two.cancel();
            }
        });

        let stream = token_stream(vec!["alpha", "beta", "gamma", "delta"]);
        let result = accumulate(stream, Some(&callback), Some(&token))
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.text, "alphabeta");
        assert_eq!(*delivered.lock().unwrap(), vec!["alpha", "beta"]);
    }
}
