//! Whole-device scenarios against in-memory peripherals

use std::format;
use std::string::String;
use std::vec;
use std::vec::Vec;

use embassy_futures::block_on;

use ccfirm_hal::StorageKey;
use ccfirm_protocol::api::pairing_url;
use ccfirm_protocol::{Fingerprint, PairingCode};

use super::boot::HALT_RECHECK_MS;
use super::indicator::badge_region;
use super::{Indicator, Orchestrator, Peripherals};
use crate::config::{save_credentials, save_settings, RefreshSettings};
use crate::fetch::FetchStatus;
use crate::provisioning::ProvisioningState;
use crate::scheduler::RefreshKind;
use crate::state::{ErrorKind, HaltReason, State};
use crate::testing::{
    bitmap_payload, patterned_payload, sample_credentials, ManualClock, MemStorage, MockChannel,
    MockNetwork, MockPanel, MockReply,
};
use crate::traits::{ChannelStatus, Clock, Network, NetworkError, RequestTimeout, ScanList};
use crate::zone::{ZoneRegistry, CANONICAL_ARENA_LEN, SCREEN_HEIGHT, SCREEN_WIDTH};

type TestOrchestrator<'a> =
    Orchestrator<'a, MockPanel, MockNetwork, MemStorage, MockChannel, ManualClock>;

const ENDPOINT: &str = "https://cc.example";
const MANIFEST: &str = "https://cc.example/api/zones";
const DEVICE_ID: [u8; 6] = [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56];
const T0: u64 = 1_000_000;

fn zone_url(id: &str) -> String {
    format!("{ENDPOINT}/api/zone/{id}")
}

/// One payload per canonical zone, in registry order
fn content(seed: u8) -> Vec<Vec<u8>> {
    ZoneRegistry::canonical()
        .all_zones()
        .enumerate()
        .map(|(i, zone)| {
            let region = zone.region();
            patterned_payload(region.width, region.height, seed.wrapping_add(i as u8))
        })
        .collect()
}

fn manifest_body(payloads: &[Vec<u8>]) -> String {
    ZoneRegistry::canonical()
        .all_zones()
        .zip(payloads)
        .map(|(zone, payload)| {
            let fingerprint = Fingerprint::of(payload).to_hex();
            format!("{} {}\n", zone.id(), fingerprint.as_str())
        })
        .collect()
}

fn serve(net: &mut MockNetwork, payloads: &[Vec<u8>]) {
    for (zone, payload) in ZoneRegistry::canonical().all_zones().zip(payloads) {
        net.set_route(&zone_url(zone.id()), MockReply::ok(payload));
    }
    net.set_route(MANIFEST, MockReply::ok(manifest_body(payloads).as_bytes()));
}

fn fail_everything(net: &mut MockNetwork) {
    for zone in ZoneRegistry::canonical().all_zones() {
        net.set_route(&zone_url(zone.id()), MockReply::timeout());
    }
    net.set_route(MANIFEST, MockReply::timeout());
}

fn provisioned_storage() -> MemStorage {
    let mut storage = MemStorage::new();
    block_on(save_credentials(&mut storage, &sample_credentials())).unwrap();
    storage
}

fn orchestrator(
    arena: &mut [u8],
    net: MockNetwork,
    storage: MemStorage,
    clock: ManualClock,
) -> TestOrchestrator<'_> {
    Orchestrator::new(
        Peripherals {
            panel: MockPanel::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            net,
            storage,
            channel: MockChannel::new(),
            clock,
        },
        ZoneRegistry::canonical(),
        arena,
        DEVICE_ID,
    )
}

/// One tick followed by the sleep it asked for, as `run` does
fn step(orch: &mut TestOrchestrator<'_>) -> u32 {
    let sleep_ms = block_on(orch.tick());
    if sleep_ms > 0 {
        block_on(orch.ctx.clock.delay_ms(sleep_ms));
    }
    sleep_ms
}

fn run_until(orch: &mut TestOrchestrator<'_>, max_ticks: usize, done: impl Fn(&State) -> bool) {
    for _ in 0..max_ticks {
        step(orch);
        if done(orch.state()) {
            return;
        }
    }
    panic!("gave up in state {:?}", orch.state());
}

/// Provisioned device that has completed its first full refresh
fn rendered<'a>(arena: &'a mut [u8], payloads: &[Vec<u8>]) -> TestOrchestrator<'a> {
    let mut net = MockNetwork::new();
    serve(&mut net, payloads);
    let mut orch = orchestrator(arena, net, provisioned_storage(), ManualClock::new(T0));
    run_until(&mut orch, 8, |s| *s == State::Idle);
    orch
}

#[test]
fn test_boot_never_touches_network() {
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(
        &mut arena,
        MockNetwork::new(),
        provisioned_storage(),
        ManualClock::new(T0),
    );

    step(&mut orch);
    assert_eq!(orch.state(), &State::NetworkConnect);
    assert_eq!(orch.ctx.net.calls(), 0);
    assert_eq!(orch.ctx.panel.init_calls, 1);
    assert_eq!(orch.context().credentials(), Some(&sample_credentials()));
}

#[test]
fn test_boot_with_corrupt_credentials_provisions() {
    let mut storage = provisioned_storage();
    block_on(ccfirm_hal::FlashStorage::write(
        &mut storage,
        StorageKey::NetworkIdentity,
        &[0xDE, 0xAD],
    ))
    .unwrap();
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, MockNetwork::new(), storage, ManualClock::new(T0));

    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );
    assert_eq!(orch.ctx.net.calls(), 0);
    assert!(orch.context().credentials().is_none());
}

#[test]
fn test_slow_storage_hits_boot_ceiling() {
    let clock = ManualClock::new(T0);
    // Settings read plus identity read exceed the 5 s ceiling
    let storage = provisioned_storage().with_read_delay(clock.handle(), 3_000);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, MockNetwork::new(), storage, clock);

    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );
    assert!(orch.context().credentials().is_none());
    assert_eq!(orch.ctx.net.calls(), 0);
}

#[test]
fn test_first_boot_provisions_and_draws_everything() {
    let payloads = content(1);
    let code = PairingCode::derive(&DEVICE_ID, 0);
    let pair = pairing_url(ENDPOINT, code.as_str()).unwrap();
    let mut net = MockNetwork::new();
    serve(&mut net, &payloads);
    net.route(&pair, MockReply::status(202));
    net.route(&pair, MockReply::ok(b"tok-5678\n"));

    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, MemStorage::new(), ManualClock::new(T0));

    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );

    step(&mut orch);
    assert!(matches!(
        orch.state(),
        State::Provisioning(ProvisioningState::AwaitingNetworkCredentials { .. })
    ));
    assert!(orch.ctx.channel.is_open);
    assert_eq!(
        orch.ctx.channel.last_status(),
        Some(&ChannelStatus::AwaitingCredentials)
    );
    assert_eq!(orch.context().indicator(), Some(Indicator::Setup));
    assert_eq!(orch.ctx.panel.full_refreshes, 1);

    // Nothing written yet: keep waiting
    assert_eq!(step(&mut orch), orch.context().settings().channel_poll_ms);

    orch.ctx
        .channel
        .push_credentials("home-net", "correct horse battery", ENDPOINT);
    step(&mut orch);
    assert!(matches!(
        orch.state(),
        State::Provisioning(ProvisioningState::AwaitingPairing(_))
    ));
    assert_eq!(
        orch.ctx.channel.last_status(),
        Some(&ChannelStatus::AwaitingPairing(code.clone()))
    );
    assert_eq!(orch.ctx.net.connect_calls, 1);

    // 202 keeps polling; 200 carries the token
    run_until(&mut orch, 4, |s| *s == State::NetworkConnect);
    assert_eq!(orch.ctx.net.requests_to(code.as_str()), 2);
    assert_eq!(orch.ctx.channel.last_status(), Some(&ChannelStatus::Paired));
    assert!(!orch.ctx.channel.is_open);
    assert_eq!(orch.ctx.storage.writes_to(StorageKey::NetworkIdentity), 1);
    assert_eq!(orch.ctx.storage.writes_to(StorageKey::PairingToken), 1);
    let token = orch.context().credentials().unwrap().pairing_token.clone();
    assert_eq!(token.as_deref(), Some("tok-5678"));

    step(&mut orch);
    assert_eq!(orch.state(), &State::Fetch);

    step(&mut orch);
    let State::Render(job) = orch.state() else {
        panic!("expected render, got {:?}", orch.state());
    };
    assert_eq!(job.plan.kind, RefreshKind::Full);
    assert_eq!(job.plan.zones.len(), 5);
    assert!(job.results.iter().all(|r| r.is_success()));
    // A full plan never sends a conditional request
    assert!(orch
        .ctx
        .net
        .requests()
        .iter()
        .filter(|r| r.url.contains("/api/zone/"))
        .all(|r| r.if_none_match.is_none()
            && r.token.as_deref() == Some("tok-5678")
            && r.timeout == RequestTimeout::DEFAULT));

    step(&mut orch);
    assert_eq!(orch.state(), &State::Idle);
    assert_eq!(orch.ctx.panel.full_refreshes, 2);
    assert!(orch.ctx.panel.partial_refreshes.is_empty());
    assert_eq!(orch.context().indicator(), None);
    let registry = orch.context().registry();
    for (index, payload) in payloads.iter().enumerate() {
        assert_eq!(registry.last_applied(index), Some(Fingerprint::of(payload)));
    }
}

#[test]
fn test_zone_pixels_reach_the_panel() {
    let mut payloads = content(7);
    payloads[0] = bitmap_payload(800, 94, true);
    payloads[4] = bitmap_payload(800, 32, false);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let orch = rendered(&mut arena, &payloads);

    let registry = orch.context().registry();
    let header = registry.get(0).unwrap().region();
    let footer = registry.get(4).unwrap().region();
    assert!(orch.ctx.panel.region_is(header, true));
    assert!(orch.ctx.panel.region_is(footer, false));
}

#[test]
fn test_unchanged_content_plans_nothing() {
    let payloads = content(2);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.net.clear_log();
    let full_refreshes = orch.ctx.panel.full_refreshes;

    run_until(&mut orch, 3, |s| *s == State::Fetch);
    step(&mut orch);
    assert_eq!(orch.state(), &State::Idle);
    assert_eq!(orch.ctx.net.requests_to("/api/zones"), 1);
    assert!(orch
        .ctx
        .net
        .requests()
        .iter()
        .all(|r| !r.url.contains("/api/zone/")));
    assert_eq!(orch.ctx.panel.full_refreshes, full_refreshes);
    assert!(orch.ctx.panel.partial_refreshes.is_empty());
}

#[test]
fn test_critical_change_redraws_one_zone_partially() {
    let mut payloads = content(3);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.cycle.partial_refresh_count_since_full = 3;
    let old_header = Fingerprint::of(&payloads[0]);

    payloads[0] = patterned_payload(800, 94, 200);
    serve(&mut orch.ctx.net, &payloads);
    orch.ctx.net.clear_log();

    run_until(&mut orch, 3, |s| *s == State::Fetch);
    step(&mut orch);
    let State::Render(job) = orch.state() else {
        panic!("expected render, got {:?}", orch.state());
    };
    assert_eq!(job.plan.kind, RefreshKind::Partial);
    assert_eq!(job.plan.zones.as_slice(), &[0]);

    let zone_requests: Vec<_> = orch
        .ctx
        .net
        .requests()
        .iter()
        .filter(|r| r.url.contains("/api/zone/"))
        .cloned()
        .collect();
    assert_eq!(zone_requests.len(), 1);
    assert_eq!(zone_requests[0].url, zone_url("header"));
    assert_eq!(zone_requests[0].if_none_match, Some(old_header));

    let full_refreshes = orch.ctx.panel.full_refreshes;
    step(&mut orch);
    assert_eq!(orch.state(), &State::Idle);
    let header = orch.context().registry().get(0).unwrap().region();
    assert_eq!(orch.ctx.panel.partial_refreshes.as_slice(), &[header]);
    assert_eq!(orch.ctx.panel.full_refreshes, full_refreshes);
    assert_eq!(orch.context().cycle().partial_refresh_count_since_full, 4);
    assert_eq!(
        orch.context().registry().last_applied(0),
        Some(Fingerprint::of(&payloads[0]))
    );
}

#[test]
fn test_manifest_outage_skips_unchanged_bodies() {
    let payloads = content(6);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    // Zones answer 200 with the bytes already on screen
    orch.ctx.net.set_route(MANIFEST, MockReply::timeout());
    orch.ctx.net.clear_log();
    let full_refreshes = orch.ctx.panel.full_refreshes;

    run_until(&mut orch, 3, |s| *s == State::Fetch);
    step(&mut orch);
    let State::Render(job) = orch.state() else {
        panic!("expected render, got {:?}", orch.state());
    };
    assert_eq!(job.plan.kind, RefreshKind::Partial);
    assert!(!job.plan.zones.is_empty());
    assert!(job
        .results
        .iter()
        .all(|r| r.status == FetchStatus::NotModified));
    assert!(orch.ctx.net.requests_to("/api/zone/header") > 0);

    step(&mut orch);
    assert_eq!(orch.state(), &State::Idle);
    assert!(orch.ctx.panel.partial_refreshes.is_empty());
    assert_eq!(orch.ctx.panel.full_refreshes, full_refreshes);
    assert_eq!(orch.context().cycle().partial_refresh_count_since_full, 0);
    assert_eq!(orch.context().cycle().consecutive_error_count, 0);
}

#[test]
fn test_partial_limit_forces_full_refresh() {
    let payloads = content(4);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.cycle.partial_refresh_count_since_full = 30;

    run_until(&mut orch, 3, |s| *s == State::Fetch);
    step(&mut orch);
    let State::Render(job) = orch.state() else {
        panic!("expected render, got {:?}", orch.state());
    };
    assert_eq!(job.plan.kind, RefreshKind::Full);
    step(&mut orch);
    assert_eq!(orch.context().cycle().partial_refresh_count_since_full, 0);
}

#[test]
fn test_repeated_timeouts_back_off_then_recover() {
    let payloads = content(5);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    fail_everything(&mut orch.ctx.net);

    let mut delays = Vec::new();
    for _ in 0..20 {
        let in_error = matches!(orch.state(), State::Error(ErrorKind::CycleFailed));
        let sleep_ms = step(&mut orch);
        if in_error {
            delays.push(sleep_ms);
            if delays.len() == 3 {
                break;
            }
        }
    }
    assert_eq!(delays, [5_000, 10_000, 20_000]);
    assert_eq!(orch.context().cycle().consecutive_error_count, 3);
    assert_eq!(orch.context().indicator(), Some(Indicator::Reconnecting));
    let badge = badge_region(orch.context().registry().screen());
    // Badge drawn once, not on every retry
    assert_eq!(orch.ctx.panel.partial_refreshes.as_slice(), &[badge]);

    serve(&mut orch.ctx.net, &payloads);
    let full_refreshes = orch.ctx.panel.full_refreshes;
    run_until(&mut orch, 6, |s| *s == State::Idle);
    assert_eq!(orch.context().cycle().consecutive_error_count, 0);
    assert_eq!(orch.context().indicator(), None);
    assert_eq!(orch.ctx.panel.full_refreshes, full_refreshes + 1);
}

#[test]
fn test_badge_stays_over_zone_that_failed_to_redraw() {
    let payloads = content(9);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    fail_everything(&mut orch.ctx.net);
    run_until(&mut orch, 6, |s| matches!(s, State::Error(_)));
    step(&mut orch);
    assert_eq!(orch.context().indicator(), Some(Indicator::Reconnecting));

    // Everything but the footer comes back
    serve(&mut orch.ctx.net, &payloads);
    orch.ctx.net.set_route(&zone_url("footer"), MockReply::timeout());
    run_until(&mut orch, 6, |s| *s == State::Idle);
    assert_eq!(orch.context().cycle().consecutive_error_count, 0);
    assert_eq!(orch.context().registry().last_applied(3), Some(Fingerprint::of(&payloads[3])));

    let badge = badge_region(orch.context().registry().screen());
    assert_eq!(orch.context().indicator(), Some(Indicator::Reconnecting));
    assert!(orch.ctx.panel.is_dark(badge.x, badge.y));
    assert!(orch.ctx.panel.is_dark(badge.x + 16, badge.y + 16));
    assert!(!orch.ctx.panel.is_dark(badge.x + 4, badge.y + 16));
}

#[test]
fn test_lost_link_reconnects() {
    let payloads = content(6);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.net.drop_link();

    step(&mut orch);
    assert_eq!(orch.state(), &State::NetworkConnect);
    step(&mut orch);
    assert_eq!(orch.state(), &State::Fetch);
    assert!(orch.ctx.net.is_connected());
}

#[test]
fn test_repeated_join_failures_discard_credentials() {
    let mut storage = provisioned_storage();
    let settings = RefreshSettings {
        connect_failures_before_reset: Some(3),
        ..RefreshSettings::default()
    };
    block_on(save_settings(&mut storage, &settings)).unwrap();
    let mut net = MockNetwork::new();
    for _ in 0..3 {
        net.push_connect_result(Err(NetworkError::JoinFailed));
    }
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, storage, ManualClock::new(T0));

    run_until(&mut orch, 10, |s| {
        *s == State::Provisioning(ProvisioningState::NoCredentials)
    });
    assert_eq!(
        orch.context().settings().connect_failures_before_reset,
        Some(3)
    );
    assert_eq!(orch.ctx.net.connect_calls, 3);
    assert!(orch.context().credentials().is_none());
    assert!(orch.ctx.storage.raw(StorageKey::NetworkIdentity).is_none());
    assert!(orch.ctx.storage.raw(StorageKey::PairingToken).is_none());
}

#[test]
fn test_join_failures_keep_credentials_by_default() {
    let mut net = MockNetwork::new();
    for _ in 0..5 {
        net.push_connect_result(Err(NetworkError::Timeout));
    }
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, provisioned_storage(), ManualClock::new(T0));

    run_until(&mut orch, 20, |s| *s == State::Fetch);
    assert_eq!(orch.ctx.net.connect_calls, 6);
    assert!(orch.context().credentials().is_some());
}

#[test]
fn test_not_configured_starts_pairing_again() {
    let payloads = content(8);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.net.set_route(MANIFEST, MockReply::status(428));

    run_until(&mut orch, 3, |s| *s == State::Fetch);
    step(&mut orch);
    let State::Provisioning(ProvisioningState::AwaitingPairing(session)) = orch.state() else {
        panic!("expected pairing, got {:?}", orch.state());
    };
    let expected = sample_credentials();
    assert_eq!(session.network, expected.network);
    assert_eq!(session.endpoint, expected.endpoint);
    let code = PairingCode::derive(&DEVICE_ID, 0);
    assert_eq!(session.code, code);
    assert_eq!(
        orch.ctx.channel.last_status(),
        Some(&ChannelStatus::AwaitingPairing(code))
    );
}

#[test]
fn test_setup_offers_visible_networks() {
    let mut net = MockNetwork::new();
    net.set_scan_results(&["office", "", "home-net", "office"]);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, MemStorage::new(), ManualClock::new(T0));

    step(&mut orch);
    step(&mut orch);
    assert_eq!(orch.ctx.net.scan_calls, 1);
    let mut networks = ScanList::new();
    networks.push(heapless::String::try_from("office").unwrap()).unwrap();
    networks.push(heapless::String::try_from("home-net").unwrap()).unwrap();
    assert_eq!(
        orch.ctx.channel.published.as_slice(),
        &[
            ChannelStatus::Networks(networks),
            ChannelStatus::AwaitingCredentials
        ]
    );

    // Waiting for writes does not rescan
    step(&mut orch);
    assert_eq!(orch.ctx.net.scan_calls, 1);
    assert_eq!(orch.ctx.net.calls(), 0);
}

#[test]
fn test_failed_scan_still_accepts_credentials() {
    let mut net = MockNetwork::new();
    net.fail_scans(NetworkError::Timeout);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, MemStorage::new(), ManualClock::new(T0));

    step(&mut orch);
    step(&mut orch);
    assert_eq!(orch.ctx.net.scan_calls, 1);
    assert_eq!(
        orch.ctx.channel.published.as_slice(),
        &[ChannelStatus::AwaitingCredentials]
    );

    orch.ctx
        .channel
        .push_credentials("home-net", "correct horse battery", ENDPOINT);
    step(&mut orch);
    assert!(matches!(
        orch.state(),
        State::Provisioning(ProvisioningState::AwaitingPairing(_))
    ));
}

#[test]
fn test_provisioning_timeout_backs_off() {
    let clock = ManualClock::new(T0);
    let time = clock.handle();
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, MockNetwork::new(), MemStorage::new(), clock);

    step(&mut orch);
    step(&mut orch);
    assert!(orch.ctx.channel.is_open);

    let timeout = orch.context().settings().provisioning_timeout_ms as u64;
    time.set(time.get() + timeout);
    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Error(ErrorKind::ProvisioningTimedOut)
    );
    assert!(!orch.ctx.channel.is_open);

    assert_eq!(step(&mut orch), 5_000);
    assert_eq!(orch.state(), &State::NetworkConnect);
    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );
    assert_eq!(orch.ctx.net.calls(), 0);
}

#[test]
fn test_join_failure_during_setup_reports_and_restarts() {
    let mut net = MockNetwork::new();
    net.push_connect_result(Err(NetworkError::JoinFailed));
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = orchestrator(&mut arena, net, MemStorage::new(), ManualClock::new(T0));

    step(&mut orch);
    step(&mut orch);
    orch.ctx
        .channel
        .push_credentials("home-net", "correct horse battery", ENDPOINT);
    step(&mut orch);
    assert_eq!(orch.ctx.channel.last_status(), Some(&ChannelStatus::Failed));
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );
    assert!(orch.ctx.storage.raw(StorageKey::NetworkIdentity).is_none());
}

#[test]
fn test_small_arena_halts_until_reset() {
    let mut arena = vec![0u8; 1_000];
    let mut orch = orchestrator(
        &mut arena,
        MockNetwork::new(),
        provisioned_storage(),
        ManualClock::new(T0),
    );

    step(&mut orch);
    assert_eq!(orch.state(), &State::Halted(HaltReason::BufferExhausted));
    assert_eq!(orch.context().indicator(), Some(Indicator::Halted));
    assert_eq!(orch.ctx.panel.full_refreshes, 1);

    assert_eq!(step(&mut orch), HALT_RECHECK_MS);
    assert_eq!(orch.state(), &State::Halted(HaltReason::BufferExhausted));
    assert_eq!(orch.ctx.net.calls(), 0);

    orch.request_factory_reset();
    step(&mut orch);
    assert_eq!(orch.state(), &State::Boot);
}

#[test]
fn test_factory_reset_from_channel() {
    let payloads = content(9);
    let mut arena = vec![0u8; CANONICAL_ARENA_LEN];
    let mut orch = rendered(&mut arena, &payloads);
    orch.ctx.channel.reset_requested = true;

    step(&mut orch);
    assert_eq!(orch.state(), &State::Boot);
    assert!(!orch.ctx.net.is_connected());
    assert!(orch.context().credentials().is_none());
    assert_eq!(orch.context().registry().last_applied(0), None);
    assert!(!orch.context().cycle().ever_drawn());
    for key in StorageKey::CREDENTIALS {
        assert!(orch.ctx.storage.raw(key).is_none());
    }

    step(&mut orch);
    assert_eq!(
        orch.state(),
        &State::Provisioning(ProvisioningState::NoCredentials)
    );
}
