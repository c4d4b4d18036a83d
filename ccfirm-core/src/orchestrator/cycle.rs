//! Steady-state loop: connect, fetch, render, idle, back off

use heapless::Vec;

use ccfirm_hal::FlashStorage;
use ccfirm_protocol::Bitmap;

use crate::config::clear_credentials;
use crate::fetch::{fetch_manifest, fetch_zone, ChangeSet, FetchStatus, ZoneRequest};
use crate::orchestrator::{DeviceContext, Indicator};
use crate::provisioning::ProvisioningState;
use crate::recovery::LinkVerdict;
use crate::scheduler::{due_tiers, needs_full, next_due_in_ms, plan_cycle, RefreshKind};
use crate::state::{ErrorKind, RenderJob, State, Transition};
use crate::traits::{Clock, ConfigChannel, EpdPanel, EpdPanelExt, Network};

impl<'a, P, N, S, C, K> DeviceContext<'a, P, N, S, C, K>
where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
    K: Clock,
{
    /// Join the network with the stored identity
    pub(crate) async fn network_connect(&mut self) -> Transition {
        let Some(credentials) = &self.credentials else {
            return Transition::now(State::Provisioning(ProvisioningState::NoCredentials));
        };
        if self.net.is_connected() {
            self.link.record_success();
            return Transition::now(State::Fetch);
        }

        let result = self
            .net
            .connect(&credentials.network, self.settings.connect_timeout())
            .await;
        match result {
            Ok(()) => {
                info!("Joined {}", credentials.network.ssid.as_str());
                self.link.record_success();
                Transition::now(State::Fetch)
            }
            Err(e) => {
                warn!("Join failed: {}", e);
                self.cycle.record_failure(self.clock.now_ms());
                match self
                    .link
                    .record_failure(self.settings.connect_failures_before_reset)
                {
                    LinkVerdict::Retry => Transition::now(State::Error(ErrorKind::ConnectFailed)),
                    LinkVerdict::ClearCredentials => {
                        warn!("Too many join failures, discarding credentials");
                        if let Err(e) = clear_credentials(&mut self.storage).await {
                            error!("Failed to clear credentials: {}", e);
                        }
                        self.credentials = None;
                        Transition::now(State::Provisioning(ProvisioningState::NoCredentials))
                    }
                }
            }
        }
    }

    /// Plan a cycle and fetch every zone in it
    pub(crate) async fn fetch(&mut self) -> Transition {
        let Some(credentials) = &self.credentials else {
            return Transition::now(State::Provisioning(ProvisioningState::NoCredentials));
        };
        if !self.net.is_connected() {
            debug!("Link down before fetch");
            return Transition::now(State::NetworkConnect);
        }

        let now = self.clock.now_ms();
        let request = ZoneRequest {
            endpoint: &credentials.endpoint,
            token: credentials.pairing_token.as_deref(),
            timeout: self.settings.http_timeout(),
        };

        let changes = if needs_full(now, &self.cycle, &self.settings) {
            ChangeSet::unknown()
        } else if due_tiers(now, &self.cycle, &self.settings).is_empty() {
            return Transition::now(State::Idle);
        } else {
            match fetch_manifest(&mut self.net, &self.registry, &request, &mut self.scratch).await {
                Ok(changes) => changes,
                Err(e) if e.requires_provisioning() => return self.enter_repairing(),
                Err(e) => {
                    warn!("Manifest unavailable ({}), refetching due zones", e);
                    ChangeSet::unknown()
                }
            }
        };

        let plan = plan_cycle(now, &self.registry, &self.cycle, &changes, &self.settings);
        if plan.is_empty() {
            debug!("No zone changed");
            self.cycle.mark_checked(plan.tiers, now);
            self.cycle.record_success();
            return Transition::now(State::Idle);
        }
        debug!("{} plan with {} zones", plan.kind, plan.zones.len());

        let mut results = Vec::new();
        for &index in plan.zones.iter() {
            let Some(zone) = self.registry.get(index).copied() else {
                continue;
            };
            let known = match plan.kind {
                RefreshKind::Partial => self.registry.last_applied(index),
                RefreshKind::Full => None,
            };
            let result =
                fetch_zone(&mut self.net, &zone, index, known, &request, &mut self.buffers).await;
            if let Some(e) = result.error() {
                if e.requires_provisioning() {
                    return self.enter_repairing();
                }
                if e.is_contract_violation() {
                    warn!("Zone {} skipped: {}", zone.id(), e);
                } else {
                    debug!("Zone {} failed: {}", zone.id(), e);
                }
            }
            // One result per plan entry
            let _ = results.push(result);
        }

        if !results.iter().any(|result| result.is_success()) {
            warn!("Cycle failed: no zone fetched");
            self.cycle.record_failure(now);
            return Transition::now(State::Error(ErrorKind::CycleFailed));
        }

        Transition::now(State::Render(RenderJob {
            plan,
            results,
            planned_at: now,
        }))
    }

    /// Draw fetched zones in plan order and refresh the panel
    pub(crate) async fn render(&mut self, job: RenderJob) -> Transition {
        let RenderJob {
            plan,
            results,
            planned_at,
        } = job;
        let keep_badge = self.clear_indicator(plan.kind, &results);

        let drawable = results
            .iter()
            .filter(|result| matches!(result.status, FetchStatus::Ok(_)))
            .count();
        let mut drawn = 0;
        for result in results.iter() {
            let FetchStatus::Ok(fingerprint) = result.status else {
                continue;
            };
            let Some(zone) = self.registry.get(result.zone_index).copied() else {
                continue;
            };
            let Some(payload) = self.buffers.payload(result.zone_index) else {
                continue;
            };
            let bitmap = match Bitmap::parse(payload) {
                Ok(bitmap) => bitmap,
                Err(e) => {
                    warn!("Zone {} not drawable: {}", zone.id(), e);
                    continue;
                }
            };

            self.panel.blit(zone.region(), &bitmap);
            if keep_badge {
                self.restore_badge(zone.region());
            }
            self.registry.record_applied(result.zone_index, fingerprint);
            drawn += 1;

            if plan.kind == RefreshKind::Partial {
                self.panel.apply_partial_refresh(zone.region()).await;
                self.cycle.record_partial_refreshes(1);
                if drawn < drawable && self.settings.settle_ms > 0 {
                    self.clock.delay_ms(self.settings.settle_ms).await;
                }
            }
        }

        if plan.kind == RefreshKind::Full {
            self.panel.apply_full_refresh().await;
            self.cycle.record_full_refresh(self.clock.now_ms());
        }
        self.cycle.mark_checked(plan.tiers, planned_at);
        self.cycle.record_success();
        info!("{} refresh: {} zones drawn", plan.kind, drawn);
        Transition::now(State::Idle)
    }

    /// Sleep until the next tier falls due
    pub(crate) fn idle(&mut self) -> Transition {
        if !self.net.is_connected() {
            info!("Link lost");
            return Transition::now(State::NetworkConnect);
        }
        let wait = next_due_in_ms(self.clock.now_ms(), &self.cycle, &self.settings);
        if wait == 0 {
            return Transition::now(State::Fetch);
        }
        let sleep_ms = wait.min(self.settings.idle_max_sleep_ms as u64) as u32;
        trace!("Idle for {} ms", sleep_ms);
        Transition::after(State::Idle, sleep_ms)
    }

    /// Show the reconnecting badge once, then back off
    pub(crate) async fn error(&mut self, kind: ErrorKind) -> Transition {
        if self.indicator != Some(Indicator::Reconnecting) {
            self.show_indicator(Indicator::Reconnecting).await;
        }
        let delay = self
            .settings
            .backoff
            .delay_ms(self.cycle.consecutive_error_count);
        warn!(
            "{} (failure {}), retrying in {} ms",
            kind, self.cycle.consecutive_error_count, delay
        );
        Transition::after(State::NetworkConnect, delay)
    }
}
