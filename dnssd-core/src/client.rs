//! Connects sessions to the local discovery daemon.
//!
//! Every session gets its own socket connection, so sessions never
//! share state on the daemon side.

use crate::config::ClientConfig;
use crate::error::DnssdError;
use crate::error::ServiceError;
use crate::protocol::{
    BrowseRequest, EnumerateDomainsRequest, PortMappingRequest, QueryRequest,
    ReconfirmRecordRequest, RegisterServiceRequest, Request, ResolveRequest,
};
use crate::session::{ReplyCallback, Session, reconfirm_record};
use crate::transport::{FramedTransport, connect_unix};
use tokio::net::UnixStream;

#[derive(Debug, Clone, Default)]
pub struct DaemonClient {
    config: ClientConfig,
}

impl DaemonClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to the daemon and start a session for `request`.
    pub async fn start(
        &self,
        request: Request,
        callback: Option<ReplyCallback>,
    ) -> Result<Session, DnssdError> {
        tracing::debug!(kind = %request.kind(), "starting session");
        let transport = self.connect().await?;
        let timeout = self.config.connect_timeout();
        tokio::time::timeout(timeout, Session::start(transport, request, callback))
            .await
            .map_err(|_| DnssdError::Timeout(timeout))?
    }

    /// Ask the daemon to re-verify a cached record that looks stale.
    pub async fn reconfirm_record(&self, request: ReconfirmRecordRequest) -> Result<(), DnssdError> {
        request.validate()?;
        let transport = self.connect().await?;
        let timeout = self.config.connect_timeout();
        tokio::time::timeout(timeout, reconfirm_record(transport, request))
            .await
            .map_err(|_| DnssdError::Timeout(timeout))?
    }

    async fn connect(&self) -> Result<FramedTransport<UnixStream>, DnssdError> {
        let timeout = self.config.connect_timeout();
        let path = &self.config.socket_path;
        tracing::debug!(path = %path.display(), "connecting to daemon");

        tokio::time::timeout(timeout, connect_unix(path))
            .await
            .map_err(|_| DnssdError::Timeout(timeout))?
            .map_err(|e| match e {
                // no daemon listening
                DnssdError::Connection(io)
                    if matches!(
                        io.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    DnssdError::Service(ServiceError::ServiceNotRunning)
                }
                other => other,
            })
    }

    pub async fn enumerate_domains(
        &self,
        request: EnumerateDomainsRequest,
        callback: ReplyCallback,
    ) -> Result<Session, DnssdError> {
        self.start(Request::EnumerateDomains(request), Some(callback))
            .await
    }

    pub async fn browse(
        &self,
        request: BrowseRequest,
        callback: ReplyCallback,
    ) -> Result<Session, DnssdError> {
        self.start(Request::Browse(request), Some(callback)).await
    }

    pub async fn resolve(
        &self,
        request: ResolveRequest,
        callback: ReplyCallback,
    ) -> Result<Session, DnssdError> {
        self.start(Request::Resolve(request), Some(callback)).await
    }

    pub async fn query_record(
        &self,
        request: QueryRequest,
        callback: ReplyCallback,
    ) -> Result<Session, DnssdError> {
        self.start(Request::QueryRecord(request), Some(callback))
            .await
    }

    /// Register a service. Without a callback, name conflicts are
    /// resolved silently by the daemon.
    pub async fn register_service(
        &self,
        request: RegisterServiceRequest,
        callback: Option<ReplyCallback>,
    ) -> Result<Session, DnssdError> {
        self.start(Request::RegisterService(request), callback)
            .await
    }

    /// Open a connection for registering individual records.
    pub async fn create_connection(
        &self,
        callback: Option<ReplyCallback>,
    ) -> Result<Session, DnssdError> {
        self.start(Request::CreateConnection, callback).await
    }

    pub async fn port_mapping(
        &self,
        request: PortMappingRequest,
        callback: ReplyCallback,
    ) -> Result<Session, DnssdError> {
        self.start(Request::PortMapping(request), Some(callback))
            .await
    }
}
