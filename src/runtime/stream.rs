//! Channel-backed in-process substitute for a gRPC server stream.
//!
//! Generated non-blocking streaming handlers use this to call a service
//! implementation directly, without a socket. The observable surface of a
//! gRPC server stream is preserved: `send` applies backpressure and observes
//! cancellation, `recv` drains until close, header and trailer operations are
//! no-ops. Invariant: exactly one producer, exactly one consumer, exactly
//! one close.

use std::any::Any;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;
use tonic::Status;

const STREAM_BUFFER: usize = 16;

/// A typed bounded-buffer channel satisfying the gRPC server-stream contract
/// without network I/O.
pub struct InProcessServerStream<T> {
    tx: Mutex<Option<mpsc::Sender<T>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<T>>,
    ct: CancellationToken,
}

impl<T: Send + 'static> InProcessServerStream<T> {
    /// Creates a stream with a buffered channel (capacity 16). The token is
    /// observed by `send` to abort early when the call is cancelled.
    pub fn new(ct: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            ct,
        }
    }

    /// Enqueues `msg`. Suspends while the buffer is full; returns a
    /// cancellation error once the stream context fires or the stream was
    /// closed.
    pub async fn send(&self, msg: T) -> Result<(), Status> {
        let tx = {
            let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
            guard.clone()
        };
        let Some(tx) = tx else {
            return Err(Status::failed_precondition(
                "InProcessServerStream: send after close",
            ));
        };
        tokio::select! {
            sent = tx.send(msg) => {
                sent.map_err(|_| Status::cancelled("InProcessServerStream: stream closed"))
            }
            _ = self.ct.cancelled() => Err(Status::cancelled("context cancelled")),
        }
    }

    /// Reads the next item. Suspends until an item arrives or the producer
    /// closes; `None` signals end-of-stream.
    pub async fn recv(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }

    /// Signals that no more items will be sent. The consumer drains any
    /// buffered items and then observes end-of-stream. Must be called exactly
    /// once, after the producer returns.
    pub fn close(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_none() {
            tracing::debug!("InProcessServerStream: close called more than once");
        }
    }

    /// The stream context. Server methods observe cancellation through it.
    pub fn context(&self) -> CancellationToken {
        self.ct.clone()
    }

    /// Type-checked dynamic send. Errors on a type mismatch so unsupported
    /// usage is caught immediately rather than silently dropping the message.
    pub async fn send_msg(&self, msg: Box<dyn Any + Send>) -> Result<(), Status> {
        match msg.downcast::<T>() {
            Ok(msg) => self.send(*msg).await,
            Err(other) => Err(Status::internal(format!(
                "InProcessServerStream::send_msg: unexpected type {:?}",
                (*other).type_id()
            ))),
        }
    }

    /// Not supported for a server stream; fails fast instead of silently
    /// succeeding.
    pub async fn recv_msg(&self) -> Result<(), Status> {
        Err(Status::unimplemented(
            "InProcessServerStream::recv_msg: not supported",
        ))
    }

    /// No-op: there is no transport to carry headers.
    pub fn set_header(&self, _md: MetadataMap) -> Result<(), Status> {
        Ok(())
    }

    /// No-op: there is no transport to carry headers.
    pub fn send_header(&self, _md: MetadataMap) -> Result<(), Status> {
        Ok(())
    }

    /// No-op: there is no transport to carry trailers.
    pub fn set_trailer(&self, _md: MetadataMap) {}
}
