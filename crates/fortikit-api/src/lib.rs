// fortikit-api: Async Rust clients for Fortinet management APIs
//
// One shared session state machine (`ApiClient`) parameterized by a
// `Product` that shapes requests for FortiManager/FortiAnalyzer (JSON-RPC),
// FortiClient EMS, FortiGate, and FortiCloud.

pub mod client;
pub mod error;
pub mod forticlientems;
pub mod forticloud;
pub mod fortigate;
pub mod jsonrpc;
pub mod product;
pub mod session;
pub mod status;
pub mod transport;

pub use client::{ApiClient, LoginOutcome, SessionState};
pub use error::Error;
pub use forticlientems::{FortiClientEms, FortiClientEmsApi};
pub use forticloud::{FortiCloudAsset, FortiCloudAssetApi};
pub use fortigate::{FortiGate, FortiGateApi};
pub use jsonrpc::{
    FortiAnalyzer, FortiAnalyzerApi, FortiManager, FortiManagerApi, Task, TaskId, TaskLimit,
    TaskLine, TaskState, TaskWait,
};
pub use product::{ClientConfig, Credentials, Product};
pub use session::{SessionStore, SessionToken};
pub use status::{Outcome, VendorStatus};
pub use transport::{ApiRequest, ApiResponse, Body, Scheme, TimeoutClass, TlsMode, TransportConfig};
