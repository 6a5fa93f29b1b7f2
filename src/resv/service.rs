//! The reservation service.
//!
//! [`ResvService`] owns the store and the reservation file behind a single
//! async mutex. Every command, lookup and expiry sweep goes through it, so
//! store mutations, file rewrites and relayed messages are strictly ordered.

use super::authority::{Create, Remove, ResvAuthority, ResvGrant, Source};
use super::enforce::{ChannelDirectory, force_part};
use super::notify::{NoticeScope, Notifier};
use super::persist::ResvFile;
use super::propagate::{PeerLinks, Propagator};
use super::record::{ResvKind, ResvRecord};
use super::request::{Origin, ResvRequest, Verb};
use super::store::ResvStore;
use crate::config::{ClusterBlock, Config, LimitsConfig, ResvConfig};
use crate::error::{PersistError, ResvError, ResvResult, ValidationError};
use crate::matcher::{IrcGlob, Matcher, is_channel_name, is_valid_nick_mask};
use crate::reply::Reply;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Mutable state, guarded by the service lock.
struct ResvState {
    store: ResvStore,
    file: ResvFile,
}

/// Outcome of loading the reservation file at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    /// Lines that could not be parsed.
    pub skipped: usize,
    /// Lines repeating a pattern already loaded.
    pub duplicates: usize,
}

/// Active reservation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResvStats {
    pub channels: usize,
    pub nicks: usize,
}

/// Channel and nickname reservations for one server.
pub struct ResvService {
    server_name: String,
    limits: LimitsConfig,
    options: ResvConfig,
    clusters: Vec<ClusterBlock>,
    matcher: Arc<dyn Matcher>,
    authority: ResvAuthority,
    propagator: Propagator,
    channels: Arc<dyn ChannelDirectory>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ResvState>,
}

impl ResvService {
    pub fn new(
        config: &Config,
        links: Arc<dyn PeerLinks>,
        channels: Arc<dyn ChannelDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_matcher(config, Arc::new(IrcGlob), links, channels, notifier)
    }

    pub fn with_matcher(
        config: &Config,
        matcher: Arc<dyn Matcher>,
        links: Arc<dyn PeerLinks>,
        channels: Arc<dyn ChannelDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            server_name: config.server.name.clone(),
            limits: config.limits.clone(),
            options: config.resv.clone(),
            clusters: config.cluster.clone(),
            authority: ResvAuthority::new(config.shared.clone(), Arc::clone(&matcher)),
            propagator: Propagator::new(links, Arc::clone(&matcher)),
            channels,
            notifier,
            state: Mutex::new(ResvState {
                store: ResvStore::new(Arc::clone(&matcher)),
                file: ResvFile::new(config.resv.path()),
            }),
            matcher,
        }
    }

    /// Load permanent reservations from the reservation file.
    pub async fn load_from_file(&self) -> Result<LoadSummary, PersistError> {
        let mut state = self.state.lock().await;
        let report = state.file.load().await?;

        let total = report.records.len();
        let duplicates = state.store.insert_loaded(report.records);
        let summary = LoadSummary {
            loaded: total - duplicates,
            skipped: report.skipped,
            duplicates,
        };

        info!(
            path = %state.file.path().display(),
            loaded = summary.loaded,
            skipped = summary.skipped,
            duplicates = summary.duplicates,
            "Loaded reservations"
        );
        Ok(summary)
    }

    /// Handle a RESV or UNRESV command from any origin.
    #[instrument(skip_all, fields(source = %source.nick, verb = verb.as_str()))]
    pub async fn handle(&self, source: &Source, verb: Verb, origin: Origin, params: &[&str]) {
        let from_client = matches!(origin, Origin::Client);
        let result = match ResvRequest::parse(verb, origin, params) {
            Ok(request) => self.dispatch(source, request).await,
            Err(e) if !from_client => {
                debug!(error = %e, "Malformed server reservation command, dropping");
                return;
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            self.report(source, e).await;
        }
    }

    /// Run a parsed request.
    pub async fn dispatch(&self, source: &Source, request: ResvRequest) -> ResvResult {
        match request {
            ResvRequest::OperCreate {
                duration,
                pattern,
                target,
                reason,
            } => {
                self.oper_create(source, duration, &pattern, target.as_deref(), reason)
                    .await
            }
            ResvRequest::OperRemove { pattern, target } => {
                self.oper_remove(source, &pattern, target.as_deref()).await
            }
            ResvRequest::RelayCreate {
                link,
                target,
                pattern,
                reason,
            } => {
                let mut state = self.state.lock().await;
                self.propagator.propagate_to_target(
                    source.wire_name(),
                    Some(&link),
                    &target,
                    0,
                    &pattern,
                    &reason,
                );
                if !self.is_me(&target) || !source.is_user() {
                    return Ok(());
                }
                match self.authority.authorize_remote(source, Create { duration: 0 }) {
                    Some(grant) => self.apply_create(&mut state, source, grant, &pattern, &reason).await,
                    None => Ok(()),
                }
            }
            ResvRequest::RelayRemove {
                link,
                target,
                pattern,
            } => {
                let mut state = self.state.lock().await;
                self.propagator
                    .propagate_removal(source.wire_name(), Some(&link), &target, &pattern);
                if !self.is_me(&target) || !source.is_user() {
                    return Ok(());
                }
                match self.authority.authorize_remote(source, Remove) {
                    Some(grant) => self.apply_remove(&mut state, source, grant, &pattern).await,
                    None => Ok(()),
                }
            }
            ResvRequest::EncapCreate {
                duration,
                pattern,
                reason,
            } => {
                let Some(grant) = self.authority.authorize_remote(source, Create { duration }) else {
                    return Ok(());
                };
                let mut state = self.state.lock().await;
                self.apply_create(&mut state, source, grant, &pattern, &reason).await
            }
            ResvRequest::EncapRemove { pattern } => {
                let Some(grant) = self.authority.authorize_remote(source, Remove) else {
                    return Ok(());
                };
                let mut state = self.state.lock().await;
                self.apply_remove(&mut state, source, grant, &pattern).await
            }
        }
    }

    async fn oper_create(
        &self,
        source: &Source,
        duration: u64,
        pattern: &str,
        target: Option<&str>,
        reason: Option<String>,
    ) -> ResvResult {
        let grant = self
            .authority
            .authorize_oper(source, target.is_some(), Create { duration })?;
        let reason = reason.ok_or(ResvError::NeedMoreParams("RESV"))?;

        let mut state = self.state.lock().await;

        if let Some(target) = target {
            let length = if duration > 0 {
                format!("{} min.", duration / 60)
            } else {
                "permanent".to_string()
            };
            self.notifier
                .notify_opers(
                    NoticeScope::Network,
                    &format!(
                        "{} is adding a {length} RESV for [{pattern}] on {target} [{reason}]",
                        grant.issuer()
                    ),
                )
                .await;

            self.propagator
                .propagate_to_target(source.wire_name(), None, target, duration, pattern, &reason);

            if !self.is_me(target) {
                return Ok(());
            }
        } else if !self.clusters.is_empty() {
            self.propagator.propagate_to_cluster(
                source.wire_name(),
                &self.clusters,
                duration,
                pattern,
                &reason,
            );
        }

        self.apply_create(&mut state, source, grant, pattern, &reason).await
    }

    async fn oper_remove(&self, source: &Source, pattern: &str, target: Option<&str>) -> ResvResult {
        let grant = self.authority.authorize_oper(source, target.is_some(), Remove)?;

        let mut state = self.state.lock().await;

        if let Some(target) = target {
            self.propagator
                .propagate_removal(source.wire_name(), None, target, pattern);
            if !self.is_me(target) {
                return Ok(());
            }
        } else if !self.clusters.is_empty() {
            self.propagator
                .cluster_removal(source.wire_name(), &self.clusters, pattern);
        }

        self.apply_remove(&mut state, source, grant, pattern).await
    }

    /// Check a new reservation against the store and the configured limits.
    fn validate(&self, store: &ResvStore, pattern: &str, reason: &str) -> Result<ResvKind, ValidationError> {
        if is_channel_name(pattern) {
            if store.lookup_channel(pattern).is_some() {
                return Err(ValidationError::ChannelReserved(pattern.to_string()));
            }
            if pattern.len() > self.limits.channellen {
                return Err(ValidationError::InvalidLength(pattern.to_string()));
            }
            if pattern.contains(',') {
                return Err(ValidationError::CommaInChannel);
            }
            if pattern.contains('"') {
                return Err(ValidationError::QuoteInChannel);
            }
            if reason.contains('"') {
                return Err(ValidationError::QuoteInReason);
            }
            Ok(ResvKind::Channel)
        } else if is_valid_nick_mask(pattern) {
            if pattern.len() > self.limits.max_nick_pattern() {
                return Err(ValidationError::InvalidLength(pattern.to_string()));
            }
            if reason.contains('"') {
                return Err(ValidationError::QuoteInReason);
            }
            let min = self.options.min_nonwildcard;
            if !self.matcher.has_min_nonwildcard_chars(pattern, min) {
                return Err(ValidationError::TooFewNonWildcard(min));
            }
            if store.find_nick_pattern(pattern).is_some() {
                return Err(ValidationError::NickReserved(pattern.to_string()));
            }
            Ok(ResvKind::Nick)
        } else {
            Err(ValidationError::InvalidMask(pattern.to_string()))
        }
    }

    /// Validate, store, persist and enforce a new reservation.
    async fn apply_create(
        &self,
        state: &mut ResvState,
        source: &Source,
        grant: ResvGrant<Create>,
        pattern: &str,
        reason: &str,
    ) -> ResvResult {
        let kind = self.validate(&state.store, pattern, reason)?;
        let Create { duration } = grant.scope();
        let now = chrono::Utc::now().timestamp();
        let record = ResvRecord::with_duration(pattern, reason, grant.issuer(), now, duration);

        state.store.insert(record.clone()).map_err(|_| match kind {
            ResvKind::Channel => ValidationError::ChannelReserved(pattern.to_string()),
            ResvKind::Nick => ValidationError::NickReserved(pattern.to_string()),
        })?;

        if record.is_temporary() {
            let minutes = duration / 60;
            info!(target: "resv", oper = %grant.issuer(), %pattern, minutes, %reason, "Temporary RESV added");
            self.notifier
                .notify_opers(
                    NoticeScope::Local,
                    &format!(
                        "{} added temporary {minutes} min. RESV for [{pattern}] [{reason}]",
                        grant.issuer()
                    ),
                )
                .await;
            self.notifier
                .reply(source, Reply::notice(format!("Added temporary {minutes} min. RESV [{pattern}]")))
                .await;
        } else {
            info!(target: "resv", oper = %grant.issuer(), %pattern, %reason, "RESV added");
            match state.file.append(&record).await {
                Ok(()) => {
                    self.notifier
                        .reply(source, Reply::notice(format!("Added RESV [{pattern}] [{reason}]")))
                        .await;
                }
                Err(e) => {
                    warn!(code = e.error_code(), error = %e, %pattern, "Failed to save RESV");
                    self.notifier
                        .reply(
                            source,
                            Reply::notice(format!(
                                "RESV [{pattern}] is active but could not be saved ({e}): it will not survive a restart"
                            )),
                        )
                        .await;
                }
            }
            self.notifier
                .notify_opers(
                    NoticeScope::Local,
                    &format!("{} added RESV for [{pattern}] [{reason}]", grant.issuer()),
                )
                .await;
        }

        if kind == ResvKind::Channel && self.options.forcepart {
            let parted = force_part(
                self.channels.as_ref(),
                self.propagator.links().as_ref(),
                self.notifier.as_ref(),
                pattern,
                reason,
                record.is_temporary(),
            )
            .await;
            if parted > 0 {
                debug!(channel = %pattern, parted, "Parted local members from reserved channel");
            }
        }

        Ok(())
    }

    /// Remove a reservation. Permanent ones leave the file first; if that
    /// fails the reservation stays active.
    async fn apply_remove(
        &self,
        state: &mut ResvState,
        source: &Source,
        grant: ResvGrant<Remove>,
        pattern: &str,
    ) -> ResvResult {
        let kind = ResvKind::of(pattern);
        let temporary = match state.store.get(kind, pattern) {
            Some(record) => record.is_temporary(),
            None => return Err(ResvError::NotFound(pattern.to_string())),
        };

        if !temporary {
            state.file.remove(pattern).await?;
        }
        state.store.remove(kind, pattern);

        info!(target: "resv", oper = %grant.issuer(), %pattern, "RESV removed");
        self.notifier
            .reply(source, Reply::notice(format!("RESV for [{pattern}] is removed")))
            .await;
        self.notifier
            .notify_opers(
                NoticeScope::Local,
                &format!("{} has removed the RESV for: [{pattern}]", grant.issuer()),
            )
            .await;

        Ok(())
    }

    async fn report(&self, source: &Source, err: ResvError) {
        match &err {
            ResvError::Persist(e) => {
                warn!(code = err.error_code(), error = %e, "RESV command failed");
            }
            _ => debug!(code = err.error_code(), error = %err, "RESV command rejected"),
        }
        if source.is_user() {
            self.notifier.reply(source, err.to_reply()).await;
        }
    }

    fn is_me(&self, target: &str) -> bool {
        self.matcher.matches(target, &self.server_name)
    }

    /// Drop temporary reservations that have lapsed at `now`.
    pub async fn expire(&self, now: i64) -> usize {
        let expired = self.state.lock().await.store.expire(now);

        for record in &expired {
            info!(target: "resv", pattern = %record.pattern, "Temporary RESV expired");
            self.notifier
                .notify_opers(
                    NoticeScope::Local,
                    &format!("Temporary RESV for [{}] expired", record.pattern),
                )
                .await;
        }

        expired.len()
    }

    /// Reservation matching a nickname, if any.
    pub async fn find_nick(&self, nick: &str) -> Option<ResvRecord> {
        self.state.lock().await.store.lookup_nick(nick).cloned()
    }

    /// Reservation on a channel, if any.
    pub async fn find_channel(&self, name: &str) -> Option<ResvRecord> {
        self.state.lock().await.store.lookup_channel(name).cloned()
    }

    /// Every active reservation, channels first.
    pub async fn list(&self) -> Vec<ResvRecord> {
        let state = self.state.lock().await;
        let mut records: Vec<_> = state.store.iter().cloned().collect();
        records.sort_by(|a, b| {
            (a.kind == ResvKind::Nick)
                .cmp(&(b.kind == ResvKind::Nick))
                .then_with(|| a.set_at.cmp(&b.set_at))
        });
        records
    }

    pub async fn stats(&self) -> ResvStats {
        let state = self.state.lock().await;
        ResvStats {
            channels: state.store.channel_count(),
            nicks: state.store.nick_count(),
        }
    }
}

/// Sweep expired temporary reservations every `period`.
pub fn spawn_expiry_task(service: Arc<ResvService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            let expired = service.expire(chrono::Utc::now().timestamp()).await;
            if expired > 0 {
                debug!(expired, "Reservation expiry sweep");
            }
        }
    })
}
