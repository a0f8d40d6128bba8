//! # Background Execution Channel
//!
//! Runs encode/decode requests off the caller's task. Every request gets
//! exactly one response:
//!
//! ```text
//! {"type":"encode","imageData":{..},"payload":[..]}  ->  {"type":"encode-result","result":{..}}
//! {"type":"decode","imageData":{..}}                 ->  {"type":"decode-result","result":[..]}
//!                                        on failure  ->  {"type":"error","error":"..."}
//! ```
//!
//! The codec is stateless, so independent requests run concurrently on the
//! blocking pool. There is no cancellation; a caller that loses interest drops
//! the reply receiver.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use zeroize::Zeroizing;

use crate::codec::{self, PixelBuffer};
use crate::crypto;
use crate::error::CryptoError;
use crate::telemetry::{Event, EventSink};

const QUEUE_DEPTH: usize = 32;

/// Raw RGBA pixels as exchanged over the channel, like a canvas `ImageData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl From<PixelBuffer> for ImageData {
    fn from(pixels: PixelBuffer) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            data: pixels.into_raw(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    Encode {
        #[serde(rename = "imageData")]
        image_data: ImageData,
        payload: Vec<u8>,
    },
    Decode {
        #[serde(rename = "imageData")]
        image_data: ImageData,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Response {
    EncodeResult { result: ImageData },
    DecodeResult { result: Vec<u8> },
    Error { error: String },
}

impl Response {
    fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }
}

/// Serves one request synchronously.
pub fn handle(request: Request, sink: &dyn EventSink) -> Response {
    match request {
        Request::Encode {
            image_data,
            payload,
        } => {
            sink.emit(Event::info("received encode request").field("payload_len", payload.len()));
            let result = PixelBuffer::new(image_data.width, image_data.height, image_data.data)
                .and_then(|cover| codec::encode(&cover, &payload));
            match result {
                Ok(stego) => {
                    sink.emit(Event::info("LSB encoding completed"));
                    Response::EncodeResult {
                        result: stego.into(),
                    }
                }
                Err(e) => {
                    sink.emit(Event::error("encoding failed").field("error", &e));
                    Response::error(format!("Encoding error: {e}"))
                }
            }
        }
        Request::Decode { image_data } => {
            sink.emit(
                Event::info("received decode request")
                    .field("width", image_data.width)
                    .field("height", image_data.height),
            );
            match codec::decode(&image_data.data, image_data.width, image_data.height) {
                Ok(bytes) => {
                    sink.emit(
                        Event::info("LSB decoding completed").field("bytes_extracted", bytes.len()),
                    );
                    Response::DecodeResult { result: bytes }
                }
                Err(e) => {
                    sink.emit(Event::error("decoding failed").field("error", &e));
                    Response::error(format!("Decoding error: {e}"))
                }
            }
        }
    }
}

struct Job {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Handle to a background task that serves [`Request`]s.
///
/// Cloning the handle shares the same task. The task stops once every handle
/// is dropped and queued jobs have been dispatched.
#[derive(Clone)]
pub struct ImageWorker {
    jobs: mpsc::Sender<Job>,
}

impl ImageWorker {
    /// Spawns the dispatcher on the current tokio runtime.
    pub fn spawn(sink: Arc<dyn EventSink>) -> Self {
        let (jobs, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(dispatch(rx, sink));
        Self { jobs }
    }

    /// Queues `request` and waits for its response.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker task is gone; request failures come
    /// back as [`Response::Error`].
    pub async fn submit(&self, request: Request) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(Job { request, reply })
            .await
            .map_err(|_| anyhow!("image worker has shut down"))?;
        response
            .await
            .context("image worker dropped the request")
    }

    pub async fn encode(&self, cover: PixelBuffer, payload: Vec<u8>) -> Result<Response> {
        self.submit(Request::Encode {
            image_data: cover.into(),
            payload,
        })
        .await
    }

    pub async fn decode(&self, stego: PixelBuffer) -> Result<Response> {
        self.submit(Request::Decode {
            image_data: stego.into(),
        })
        .await
    }
}

async fn dispatch(mut rx: mpsc::Receiver<Job>, sink: Arc<dyn EventSink>) {
    while let Some(Job { request, reply }) = rx.recv().await {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let task_sink = Arc::clone(&sink);
            let response = tokio::task::spawn_blocking(move || handle(request, task_sink.as_ref()))
                .await
                .unwrap_or_else(|e| {
                    sink.emit(Event::error("worker operation failed").field("error", &e));
                    Response::error(format!("worker task failed: {e}"))
                });
            // receiver gone means the caller abandoned the request
            let _ = reply.send(response);
        });
    }
}

/// Reads one JSON request per line and writes one JSON response per line, in order.
///
/// Lines that do not parse get an error response. Blank lines are skipped.
pub async fn serve<R, W>(reader: R, mut writer: W, worker: &ImageWorker) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => worker.submit(request).await?,
            Err(e) => Response::error(format!("invalid request: {e}")),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn task_failed(err: tokio::task::JoinError) -> CryptoError {
    CryptoError::TaskFailed(err.to_string())
}

/// [`crypto::encrypt`] on the blocking pool.
pub async fn encrypt(plaintext: String, password: Zeroizing<String>) -> Result<Vec<u8>, CryptoError> {
    tokio::task::spawn_blocking(move || crypto::encrypt(&plaintext, &password))
        .await
        .unwrap_or_else(|e| Err(task_failed(e)))
}

/// [`crypto::decrypt`] on the blocking pool.
pub async fn decrypt(
    blob: Vec<u8>,
    password: Zeroizing<String>,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    tokio::task::spawn_blocking(move || crypto::decrypt(&blob, &password))
        .await
        .unwrap_or_else(|e| Err(task_failed(e)))
}
