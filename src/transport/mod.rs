// HTTP transport capability — issues requests and streams response bytes.

pub mod http_transport;
pub mod traits;

pub use http_transport::HttpTransport;
pub use traits::{ByteRange, ContentInfo, FetchReply, Transport, TransferRequest};
