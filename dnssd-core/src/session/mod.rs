//! Discovery sessions.
//!
//! A [`Session`] is one long-lived operation against the daemon: it owns
//! a [`Transport`], the caller's reply callback, and (for register-service
//! and connection sessions) the records registered through it.
//!
//! ```text
//! Session::start ──► write request ──► await Ack ──► Active
//!                                        │
//!                              error ≠ 0 └──► Err, no session
//!
//! Active ──process_result──► decode ──► callback(Ok(reply) | Err(e))
//!   │
//!   ├── error on reg_index n ──► callback(Err(Record { n })), record n dropped
//!   ├── peer closed / framing error ──► callback(Err) ──► Terminated
//!   └── teardown() / drop ────────────────────────────► Terminated
//! ```
//!
//! Sessions never time out on their own; deadlines belong to whoever
//! drives them (see [`crate::reactor`]).

mod phase;
mod records;

use std::task::Poll;

pub use phase::SessionPhase;
pub use records::{RecordId, RecordRef, RecordRegistry, TrackedRecord};

use crate::error::{DnssdError, ServiceError};
use crate::flags::ServiceFlags;
use crate::frame::Frame;
use crate::op::{Op, OperationKind};
use crate::protocol::{
    AddRecordRequest, ReconfirmRecordRequest, RegisterRecordRequest, RemoveRecordRequest, Reply,
    Request, UpdateRecordRequest,
};
use crate::transport::{Descriptor, Transport};
use crate::txt::MAX_RECORD_LEN;

/// Receives every reply, or the error that replaced it.
pub type ReplyCallback = Box<dyn FnMut(Result<Reply, DnssdError>) + Send>;

pub struct Session {
    descriptor: Descriptor,
    kind: OperationKind,
    flags: ServiceFlags,
    phase: SessionPhase,
    transport: Option<Box<dyn Transport>>,
    callback: Option<ReplyCallback>,
    records: RecordRegistry,
    more_coming: bool,
}

impl Session {
    /// Validate `request`, send it over `transport` and wait for the
    /// daemon's acknowledgement.
    ///
    /// On any failure the transport is closed and no session exists; the
    /// callback is never invoked.
    pub async fn start<T>(
        mut transport: T,
        request: Request,
        callback: Option<ReplyCallback>,
    ) -> Result<Self, DnssdError>
    where
        T: Transport + 'static,
    {
        request.validate(callback.is_some())?;

        let kind = request.kind();
        let flags = request.flags();
        let descriptor = transport.descriptor();
        tracing::debug!(%descriptor, %kind, ?flags, "starting session");

        if let Err(e) = handshake(&mut transport, request.to_frame()?).await {
            transport.close();
            tracing::debug!(%descriptor, %kind, error = %e, "session rejected");
            return Err(e);
        }

        let mut phase = SessionPhase::Pending;
        phase.activate()?;
        tracing::info!(%descriptor, %kind, "session active");

        Ok(Self {
            descriptor,
            kind,
            flags,
            phase,
            transport: Some(Box::new(transport)),
            callback,
            records: RecordRegistry::new(descriptor),
            more_coming: false,
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn flags(&self) -> ServiceFlags {
        self.flags
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// The last processed reply announced that more are queued.
    pub fn more_coming(&self) -> bool {
        self.more_coming
    }

    /// Number of live sub-registrations.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ── Processing ───────────────────────────────────────────────

    /// Wait for the next reply and hand it to the callback.
    ///
    /// Returns `Err` only when the session can make no further progress;
    /// per-reply problems go to the callback and yield `Ok`.
    pub async fn process_result(&mut self) -> Result<(), DnssdError> {
        self.phase.require_active()?;
        let transport = self
            .transport
            .as_mut()
            .ok_or(DnssdError::InvalidState("transport released"))?;
        let next = transport.read_frame().await;
        self.dispatch(next)
    }

    /// Process one reply if it is already available.
    ///
    /// `Ok(false)` means nothing was ready and the callback was not invoked.
    pub fn try_process_result(&mut self) -> Result<bool, DnssdError> {
        self.phase.require_active()?;
        let transport = self
            .transport
            .as_mut()
            .ok_or(DnssdError::InvalidState("transport released"))?;
        match transport.try_read_frame() {
            Poll::Pending => Ok(false),
            Poll::Ready(next) => self.dispatch(next).map(|()| true),
        }
    }

    fn dispatch(&mut self, next: Result<Option<Frame>, DnssdError>) -> Result<(), DnssdError> {
        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(descriptor = %self.descriptor, "daemon closed the connection");
                return Err(self.fail(DnssdError::Service(ServiceError::ServiceNotRunning)));
            }
            Err(e) => {
                tracing::warn!(descriptor = %self.descriptor, error = %e, "transport failure");
                return Err(self.fail(e));
            }
        };

        self.more_coming = frame.flags().more_coming();

        if let Err(e) = ServiceError::check(frame.header().error()) {
            if frame.reg_index() != 0 && self.kind.owns_records() {
                self.reject_record(RecordId(frame.reg_index()), e);
                return Ok(());
            }
            tracing::debug!(descriptor = %self.descriptor, error = %e, "daemon reported error");
            self.deliver(Err(e.into()));
            if self.kind.is_one_shot(self.flags) {
                self.teardown();
            }
            return Ok(());
        }

        let reply = Reply::decode(self.kind, &frame);
        if let Err(e) = &reply {
            tracing::warn!(descriptor = %self.descriptor, op = %frame.op(), error = %e, "undecodable reply");
        }
        self.deliver(reply);
        Ok(())
    }

    /// Stop tracking a sub-registration the daemon refused and tell the
    /// callback which one it was. The session itself is unaffected.
    fn reject_record(&mut self, record: RecordId, error: ServiceError) {
        match self.records.forget(record) {
            Some(tracked) => tracing::debug!(
                descriptor = %self.descriptor,
                %record,
                rrtype = tracked.rrtype,
                %error,
                "sub-registration rejected"
            ),
            None => tracing::debug!(
                descriptor = %self.descriptor,
                %record,
                %error,
                "rejection for untracked record"
            ),
        }
        self.deliver(Err(DnssdError::Record { record, error }));
    }

    /// Report a fatal `cause` and terminate. The returned error is what
    /// the processing call reports.
    fn fail(&mut self, cause: DnssdError) -> DnssdError {
        self.more_coming = false;
        self.deliver(Err(cause));
        self.teardown();
        DnssdError::Service(ServiceError::ServiceNotRunning)
    }

    fn deliver(&mut self, result: Result<Reply, DnssdError>) {
        if let Some(callback) = self.callback.as_mut() {
            callback(result);
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Close the transport, invalidate every sub-registration and drop
    /// the callback. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.phase.is_terminated() && self.transport.is_none() {
            return;
        }
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        let dropped = self.records.clear();
        let lifetime = self.phase.active_duration();
        self.callback = None;
        self.more_coming = false;
        self.phase.terminate();
        tracing::debug!(descriptor = %self.descriptor, records = dropped, ?lifetime, "session torn down");
    }

    // ── Sub-registrations ────────────────────────────────────────

    /// Register an individual record on a connection session.
    ///
    /// Exactly one of `SHARED` or `UNIQUE` must be set in `params.flags`.
    pub async fn register_record(
        &mut self,
        params: RegisterRecordRequest,
    ) -> Result<RecordRef, DnssdError> {
        self.require_kind(OperationKind::CreateConnection)?;
        let ownership = params.flags & (ServiceFlags::SHARED | ServiceFlags::UNIQUE);
        if ownership.bits().count_ones() != 1 {
            return Err(ServiceError::BadFlags.into());
        }
        if params.fullname.is_empty() || params.rdata.len() > MAX_RECORD_LEN {
            return Err(ServiceError::BadParam.into());
        }

        let record = self.records.insert(params.rrtype);
        let frame = Frame::request(Op::RegisterRecord, params.flags, record.id().0, &params)?;
        if let Err(e) = self.send(frame).await {
            self.records.remove(&record);
            return Err(e);
        }
        Ok(record)
    }

    /// Attach an extra record to a registered service.
    pub async fn add_record(
        &mut self,
        rrtype: u16,
        rdata: &[u8],
        ttl: u32,
    ) -> Result<RecordRef, DnssdError> {
        self.require_kind(OperationKind::RegisterService)?;
        if rdata.len() > MAX_RECORD_LEN {
            return Err(ServiceError::BadParam.into());
        }

        let record = self.records.insert(rrtype);
        let body = AddRecordRequest {
            rrtype,
            rdata: rdata.to_vec(),
            ttl,
        };
        let frame = Frame::request(Op::AddRecord, ServiceFlags::empty(), record.id().0, &body)?;
        if let Err(e) = self.send(frame).await {
            self.records.remove(&record);
            return Err(e);
        }
        Ok(record)
    }

    /// Replace the rdata of `record`, or of the service's primary TXT
    /// record when `record` is `None`.
    pub async fn update_record(
        &mut self,
        record: Option<&RecordRef>,
        rdata: &[u8],
        ttl: u32,
    ) -> Result<(), DnssdError> {
        self.phase.require_active()?;
        if !self.kind.owns_records() {
            return Err(ServiceError::BadReference.into());
        }
        let index = match record {
            Some(r) if self.records.owns(r) => r.id(),
            Some(_) => return Err(ServiceError::BadReference.into()),
            None if self.kind == OperationKind::RegisterService => RecordId::PRIMARY,
            None => return Err(ServiceError::BadReference.into()),
        };
        if rdata.len() > MAX_RECORD_LEN {
            return Err(ServiceError::BadParam.into());
        }

        let body = UpdateRecordRequest {
            rdata: rdata.to_vec(),
            ttl,
        };
        let frame = Frame::request(Op::UpdateRecord, ServiceFlags::empty(), index.0, &body)?;
        self.send(frame).await
    }

    /// Deregister `record`. The handle is consumed whatever the outcome.
    pub async fn remove_record(&mut self, record: RecordRef) -> Result<(), DnssdError> {
        self.phase.require_active()?;
        if !self.records.owns(&record) {
            return Err(ServiceError::BadReference.into());
        }
        self.records.remove(&record);
        let frame = Frame::request(
            Op::RemoveRecord,
            ServiceFlags::empty(),
            record.id().0,
            &RemoveRecordRequest,
        )?;
        self.send(frame).await
    }

    fn require_kind(&self, kind: OperationKind) -> Result<(), DnssdError> {
        self.phase.require_active()?;
        if self.kind != kind {
            return Err(ServiceError::BadReference.into());
        }
        Ok(())
    }

    async fn send(&mut self, frame: Frame) -> Result<(), DnssdError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(DnssdError::InvalidState("transport released"))?;
        transport.write_frame(frame).await
    }
}

/// Send `frame` and wait for the daemon's accept/reject verdict.
async fn handshake<T: Transport>(transport: &mut T, frame: Frame) -> Result<(), DnssdError> {
    transport.write_frame(frame).await?;
    let ack = transport
        .read_frame()
        .await?
        .ok_or(DnssdError::Service(ServiceError::ServiceNotRunning))?;
    if ack.op() != Op::Ack {
        return Err(DnssdError::ProtocolViolation("expected acknowledgement"));
    }
    ServiceError::check(ack.header().error())?;
    Ok(())
}

/// Ask the daemon to re-verify a cached record.
///
/// One request and its acknowledgement; `transport` is closed afterwards
/// whatever the outcome.
pub async fn reconfirm_record<T: Transport>(
    mut transport: T,
    request: ReconfirmRecordRequest,
) -> Result<(), DnssdError> {
    request.validate()?;
    let descriptor = transport.descriptor();
    let result = handshake(&mut transport, request.to_frame()?).await;
    transport.close();
    match &result {
        Ok(()) => tracing::debug!(%descriptor, fullname = %request.fullname, "reconfirm accepted"),
        Err(e) => tracing::debug!(%descriptor, error = %e, "reconfirm rejected"),
    }
    result
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("phase", &self.phase)
            .field("records", &self.records.len())
            .field("more_coming", &self.more_coming)
            .finish()
    }
}
