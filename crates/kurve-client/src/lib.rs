//! Client side of Kurve: folds the server's snapshot stream into smoothly
//! predicted curves and tracks the room's roster and scores.
//!
//! Rendering is left to the embedder through [`trail::TrailCanvas`].

pub mod net_client;
pub mod reconcile;
pub mod session;
pub mod trail;

pub use net_client::{ClientError, WsClient};
pub use reconcile::{ClientCurve, ClientGame, ReconcileConfig};
pub use session::ClientSession;
pub use trail::{RecordingCanvas, Stroke, StrokeKind, TrailCanvas};
