//! Provisioning I/O
//!
//! Drives the provisioning sub-states: channel polling, the one-shot join,
//! pairing polls and the single credential write.

use ccfirm_hal::FlashStorage;
use ccfirm_protocol::api::pairing_url;
use ccfirm_protocol::PairingCode;

use crate::config::{save_credentials, DeviceCredentials, Endpoint, NetworkIdentity};
use crate::orchestrator::{DeviceContext, Indicator};
use crate::provisioning::{
    interpret_pairing_response, tidy_networks, CredentialDraft, PairingPoll, PairingSession,
    ProvisioningState, MAX_WRITES_PER_POLL,
};
use crate::scheduler::RefreshCycleState;
use crate::state::{ErrorKind, State, Transition};
use crate::traits::{ChannelStatus, Clock, ConfigChannel, EpdPanel, Network, Request, ScanList};

impl<'a, P, N, S, C, K> DeviceContext<'a, P, N, S, C, K>
where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
    K: Clock,
{
    /// Run one provisioning step
    pub(crate) async fn provision(&mut self, state: ProvisioningState) -> Transition {
        match state {
            ProvisioningState::NoCredentials => self.open_provisioning().await,
            ProvisioningState::AwaitingNetworkCredentials { since, draft } => {
                self.collect_credentials(since, draft).await
            }
            ProvisioningState::AwaitingPairing(session) => self.poll_pairing(session).await,
            ProvisioningState::Provisioned(credentials) => {
                self.finish_provisioning(credentials).await
            }
        }
    }

    /// Re-pair with the current network identity after a "not configured" reply
    pub(crate) fn enter_repairing(&mut self) -> Transition {
        warn!("Service reports device not configured");
        match self.credentials.clone() {
            Some(credentials) => {
                Transition::now(self.start_pairing(credentials.network, credentials.endpoint))
            }
            None => Transition::now(State::Provisioning(ProvisioningState::NoCredentials)),
        }
    }

    async fn open_provisioning(&mut self) -> Transition {
        info!("Provisioning: waiting for credentials");
        self.credentials = None;
        self.channel.open();
        self.publish_networks().await;
        self.channel.publish(&ChannelStatus::AwaitingCredentials);
        if self.indicator != Some(Indicator::Setup) {
            self.show_indicator(Indicator::Setup).await;
        }
        Transition::now(State::Provisioning(
            ProvisioningState::AwaitingNetworkCredentials {
                since: self.clock.now_ms(),
                draft: CredentialDraft::default(),
            },
        ))
    }

    /// Offer the visible networks to pick the SSID from
    async fn publish_networks(&mut self) {
        let mut found = ScanList::new();
        if let Err(e) = self
            .net
            .scan(&mut found, self.settings.connect_timeout())
            .await
        {
            warn!("Network scan failed: {}", e);
            return;
        }
        let networks = tidy_networks(&found);
        debug!("{} networks visible", networks.len());
        if !networks.is_empty() {
            self.channel.publish(&ChannelStatus::Networks(networks));
        }
    }

    async fn collect_credentials(&mut self, since: u64, mut draft: CredentialDraft) -> Transition {
        for _ in 0..MAX_WRITES_PER_POLL {
            match self.channel.poll_write() {
                Some(write) => draft.apply(write),
                None => break,
            }
        }

        let now = self.clock.now_ms();
        let Some((network, endpoint)) = draft.complete(self.settings.default_endpoint.as_ref())
        else {
            if now.saturating_sub(since) >= self.settings.provisioning_timeout_ms as u64 {
                warn!("No credentials received in time");
                self.channel.close();
                self.cycle.record_failure(now);
                return Transition::now(State::Error(ErrorKind::ProvisioningTimedOut));
            }
            return Transition::after(
                State::Provisioning(ProvisioningState::AwaitingNetworkCredentials { since, draft }),
                self.settings.channel_poll_ms,
            );
        };

        info!("Credentials complete, joining {}", network.ssid.as_str());
        self.channel.publish(&ChannelStatus::Joining);
        match self
            .net
            .connect(&network, self.settings.connect_timeout())
            .await
        {
            Ok(()) => Transition::now(self.start_pairing(network, endpoint)),
            Err(e) => {
                warn!("Join failed: {}", e);
                self.channel.publish(&ChannelStatus::Failed);
                Transition::after(
                    State::Provisioning(ProvisioningState::NoCredentials),
                    self.settings.channel_poll_ms,
                )
            }
        }
    }

    fn start_pairing(&mut self, network: NetworkIdentity, endpoint: Endpoint) -> State {
        let code = PairingCode::derive(&self.device_id, self.pairing_attempt);
        self.pairing_attempt = self.pairing_attempt.wrapping_add(1);
        info!("Pairing code {}", code.as_str());
        self.channel.open();
        self.channel
            .publish(&ChannelStatus::AwaitingPairing(code.clone()));
        State::Provisioning(ProvisioningState::AwaitingPairing(PairingSession::new(
            self.clock.now_ms(),
            code,
            network,
            endpoint,
        )))
    }

    async fn poll_pairing(&mut self, mut session: PairingSession) -> Transition {
        let now = self.clock.now_ms();
        if session.timed_out(now, self.settings.pairing_timeout_ms) {
            warn!("Pairing not confirmed in time");
            self.channel.publish(&ChannelStatus::Failed);
            return Transition::now(State::Provisioning(ProvisioningState::NoCredentials));
        }

        let wait = session.poll_due_in(now, self.settings.pairing_poll_ms);
        if wait > 0 {
            return Transition::after(
                State::Provisioning(ProvisioningState::AwaitingPairing(session)),
                wait as u32,
            );
        }

        let url = match pairing_url(&session.endpoint, session.code.as_str()) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build pairing URL: {}", e);
                return Transition::now(State::Provisioning(ProvisioningState::NoCredentials));
            }
        };
        let request = Request {
            url: &url,
            token: None,
            if_none_match: None,
            timeout: self.settings.http_timeout(),
        };
        session.last_poll_at = Some(now);

        let poll = match self.net.get(&request, &mut self.scratch).await {
            Ok(response) if !response.overflowed => {
                let len = response.body_len.min(self.scratch.len());
                interpret_pairing_response(response.status, &self.scratch[..len])
            }
            Ok(response) => PairingPoll::Failed(response.status),
            Err(e) => {
                debug!("Pairing poll failed: {}", e);
                PairingPoll::Pending
            }
        };

        match poll {
            PairingPoll::Paired(token) => {
                info!("Pairing confirmed");
                Transition::now(State::Provisioning(ProvisioningState::Provisioned(
                    DeviceCredentials {
                        network: session.network,
                        endpoint: session.endpoint,
                        pairing_token: Some(token),
                    },
                )))
            }
            PairingPoll::Pending => Transition::after(
                State::Provisioning(ProvisioningState::AwaitingPairing(session)),
                self.settings.pairing_poll_ms,
            ),
            PairingPoll::Failed(status) => {
                debug!("Pairing poll returned {}", status);
                Transition::after(
                    State::Provisioning(ProvisioningState::AwaitingPairing(session)),
                    self.settings.pairing_poll_ms,
                )
            }
        }
    }

    async fn finish_provisioning(&mut self, credentials: DeviceCredentials) -> Transition {
        if let Err(e) = save_credentials(&mut self.storage, &credentials).await {
            error!("Failed to persist credentials: {}", e);
        }
        self.channel.publish(&ChannelStatus::Paired);
        self.channel.close();
        self.credentials = Some(credentials);
        self.cycle = RefreshCycleState::new();
        self.link.record_success();
        info!("Provisioned");
        Transition::now(State::NetworkConnect)
    }
}
