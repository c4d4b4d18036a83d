//! In-memory device mocks for host tests

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String as StdString, ToString};
use std::vec::Vec as StdVec;

use ccfirm_hal::{FlashError, FlashStorage, StorageKey};
use ccfirm_protocol::bitmap::{encoded_len, row_stride, write_header};
use ccfirm_protocol::Fingerprint;

use crate::config::{DeviceCredentials, Endpoint, NetworkIdentity, PairingToken};
use crate::traits::{
    ChannelStatus, ChannelWrite, Clock, ConfigChannel, EpdPanel, Network, NetworkError, Region,
    Request, RequestTimeout, Response, ScanList,
};

/// Shared millisecond counter
pub type TimeHandle = Rc<Cell<u64>>;

pub fn sample_credentials() -> DeviceCredentials {
    DeviceCredentials {
        network: NetworkIdentity {
            ssid: heapless::String::try_from("home-net").unwrap(),
            passphrase: heapless::String::try_from("correct horse battery").unwrap(),
        },
        endpoint: Endpoint::try_from("https://cc.example").unwrap(),
        pairing_token: Some(PairingToken::try_from("tok-1234").unwrap()),
    }
}

/// Top-down 1-bit bitmap; every pixel dark or every pixel light
pub fn bitmap_payload(width: u16, height: u16, dark: bool) -> StdVec<u8> {
    let mut data = std::vec![0u8; encoded_len(width, height)];
    let start = write_header(&mut data, width, height).unwrap();
    // Palette index 0 is dark
    data[start..].fill(if dark { 0x00 } else { 0xFF });
    data
}

/// Top-down 1-bit bitmap with a pattern derived from `seed`
pub fn patterned_payload(width: u16, height: u16, seed: u8) -> StdVec<u8> {
    let mut data = std::vec![0u8; encoded_len(width, height)];
    let start = write_header(&mut data, width, height).unwrap();
    let stride = row_stride(width);
    for (i, byte) in data[start..].iter_mut().enumerate() {
        *byte = seed.wrapping_mul(31).wrapping_add((i % stride) as u8);
    }
    data
}

// ---------------------------------------------------------------- clock

pub struct ManualClock {
    now: TimeHandle,
    pub delays: StdVec<u32>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            delays: StdVec::new(),
        }
    }

    pub fn handle(&self) -> TimeHandle {
        self.now.clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.now.set(self.now.get() + ms as u64);
    }
}

// ---------------------------------------------------------------- panel

pub struct MockPanel {
    width: u16,
    height: u16,
    pixels: StdVec<bool>,
    pub init_calls: usize,
    pub full_refreshes: usize,
    pub partial_refreshes: StdVec<Region>,
}

impl MockPanel {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: std::vec![false; width as usize * height as usize],
            init_calls: 0,
            full_refreshes: 0,
            partial_refreshes: StdVec::new(),
        }
    }

    pub fn is_dark(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height && self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Whether every pixel of a region has one colour
    pub fn region_is(&self, region: Region, dark: bool) -> bool {
        (region.y..region.y + region.height)
            .all(|y| (region.x..region.x + region.width).all(|x| self.is_dark(x, y) == dark))
    }
}

impl EpdPanel for MockPanel {
    async fn init(&mut self) {
        self.init_calls += 1;
    }

    fn set_pixel(&mut self, x: u16, y: u16, dark: bool) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = dark;
        }
    }

    async fn apply_full_refresh(&mut self) {
        self.full_refreshes += 1;
    }

    async fn apply_partial_refresh(&mut self, region: Region) {
        self.partial_refreshes.push(region);
    }
}

// ---------------------------------------------------------------- network

#[derive(Debug, Clone)]
enum ReplyKind {
    Body {
        status: u16,
        body: StdVec<u8>,
        declared: Option<usize>,
    },
    Timeout,
    Transport,
}

#[derive(Debug, Clone)]
pub struct MockReply(ReplyKind);

impl MockReply {
    pub fn ok(body: &[u8]) -> Self {
        Self(ReplyKind::Body {
            status: 200,
            body: body.to_vec(),
            declared: None,
        })
    }

    pub fn status(status: u16) -> Self {
        Self(ReplyKind::Body {
            status,
            body: StdVec::new(),
            declared: None,
        })
    }

    pub fn timeout() -> Self {
        Self(ReplyKind::Timeout)
    }

    pub fn transport() -> Self {
        Self(ReplyKind::Transport)
    }

    pub fn with_declared_len(mut self, len: usize) -> Self {
        if let ReplyKind::Body { declared, .. } = &mut self.0 {
            *declared = Some(len);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub url: StdString,
    pub token: Option<StdString>,
    pub if_none_match: Option<Fingerprint>,
    pub timeout: RequestTimeout,
}

/// Scripted network; a route's last reply repeats once its queue drains
pub struct MockNetwork {
    connected: bool,
    routes: StdVec<(StdString, VecDeque<MockReply>)>,
    connect_results: VecDeque<Result<(), NetworkError>>,
    requests: StdVec<SentRequest>,
    scan_result: Result<StdVec<StdString>, NetworkError>,
    pub connect_calls: usize,
    pub scan_calls: usize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            connected: false,
            routes: StdVec::new(),
            connect_results: VecDeque::new(),
            requests: StdVec::new(),
            scan_result: Ok(StdVec::new()),
            connect_calls: 0,
            scan_calls: 0,
        }
    }

    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::new()
        }
    }

    /// Queue a reply for a URL
    pub fn route(&mut self, url: &str, reply: MockReply) {
        match self.routes.iter_mut().find(|(u, _)| u == url) {
            Some((_, queue)) => queue.push_back(reply),
            None => self
                .routes
                .push((url.to_string(), VecDeque::from([reply]))),
        }
    }

    /// Replace every queued reply for a URL
    pub fn set_route(&mut self, url: &str, reply: MockReply) {
        self.routes.retain(|(u, _)| u != url);
        self.route(url, reply);
    }

    /// Queue the outcome of the next `connect` calls (default: success)
    pub fn push_connect_result(&mut self, result: Result<(), NetworkError>) {
        self.connect_results.push_back(result);
    }

    /// Names every later scan reports, strongest first
    pub fn set_scan_results(&mut self, ssids: &[&str]) {
        self.scan_result = Ok(ssids.iter().map(ToString::to_string).collect());
    }

    pub fn fail_scans(&mut self, error: NetworkError) {
        self.scan_result = Err(error);
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    pub fn requests(&self) -> &[SentRequest] {
        &self.requests
    }

    /// Requests made to URLs ending in `suffix`
    pub fn requests_to(&self, suffix: &str) -> usize {
        self.requests.iter().filter(|r| r.url.ends_with(suffix)).count()
    }

    /// Every connect and get call made so far
    pub fn calls(&self) -> usize {
        self.connect_calls + self.requests.len()
    }

    pub fn clear_log(&mut self) {
        self.requests.clear();
        self.connect_calls = 0;
    }

    fn next_reply(&mut self, url: &str) -> MockReply {
        match self.routes.iter_mut().find(|(u, _)| u == url) {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some((_, queue)) => queue.front().cloned().unwrap(),
            None => MockReply::status(404),
        }
    }
}

impl Network for MockNetwork {
    async fn connect(
        &mut self,
        _identity: &NetworkIdentity,
        _timeout: RequestTimeout,
    ) -> Result<(), NetworkError> {
        self.connect_calls += 1;
        let result = self.connect_results.pop_front().unwrap_or(Ok(()));
        self.connected = result.is_ok();
        result
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn get(&mut self, request: &Request<'_>, body: &mut [u8]) -> Result<Response, NetworkError> {
        self.requests.push(SentRequest {
            url: request.url.to_string(),
            token: request.token.map(ToString::to_string),
            if_none_match: request.if_none_match,
            timeout: request.timeout,
        });
        match self.next_reply(request.url).0 {
            ReplyKind::Body {
                status,
                body: data,
                declared,
            } => {
                let copied = data.len().min(body.len());
                body[..copied].copy_from_slice(&data[..copied]);
                Ok(Response {
                    status,
                    content_length: Some(declared.unwrap_or(data.len())),
                    body_len: copied,
                    overflowed: data.len() > body.len(),
                })
            }
            ReplyKind::Timeout => Err(NetworkError::Timeout),
            ReplyKind::Transport => Err(NetworkError::Transport),
        }
    }

    async fn scan(
        &mut self,
        out: &mut ScanList,
        _timeout: RequestTimeout,
    ) -> Result<(), NetworkError> {
        self.scan_calls += 1;
        let ssids = self.scan_result.clone()?;
        for ssid in ssids {
            if out.push(heapless::String::try_from(ssid.as_str()).unwrap()).is_err() {
                break;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------- storage

pub struct MemStorage {
    entries: StdVec<(StorageKey, StdVec<u8>)>,
    writes: StdVec<StorageKey>,
    /// Advanced by `read_delay_ms` on every read
    clock: Option<TimeHandle>,
    read_delay_ms: u64,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            entries: StdVec::new(),
            writes: StdVec::new(),
            clock: None,
            read_delay_ms: 0,
        }
    }

    /// Make every read take `delay_ms` of clock time
    pub fn with_read_delay(mut self, clock: TimeHandle, delay_ms: u64) -> Self {
        self.clock = Some(clock);
        self.read_delay_ms = delay_ms;
        self
    }

    pub fn writes_to(&self, key: StorageKey) -> usize {
        self.writes.iter().filter(|&&k| k == key).count()
    }

    pub fn raw(&self, key: StorageKey) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
    }
}

impl FlashStorage for MemStorage {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        if let Some(clock) = &self.clock {
            clock.set(clock.get() + self.read_delay_ms);
        }
        let value = self.raw(key).ok_or(FlashError::NotFound)?;
        if value.len() > buffer.len() {
            return Err(FlashError::BufferTooSmall);
        }
        buffer[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        self.writes.push(key);
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, data.to_vec()));
        Ok(())
    }

    async fn remove(&mut self, key: StorageKey) -> Result<(), FlashError> {
        self.entries.retain(|(k, _)| *k != key);
        Ok(())
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        self.raw(key).is_some()
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.entries.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------- channel

pub struct MockChannel {
    pending: VecDeque<ChannelWrite>,
    pub published: StdVec<ChannelStatus>,
    pub is_open: bool,
    pub reset_requested: bool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            published: StdVec::new(),
            is_open: false,
            reset_requested: false,
        }
    }

    pub fn push_write(&mut self, write: ChannelWrite) {
        self.pending.push_back(write);
    }

    /// Queue SSID, passphrase and endpoint writes
    pub fn push_credentials(&mut self, ssid: &str, passphrase: &str, endpoint: &str) {
        self.push_write(ChannelWrite::Ssid(heapless::String::try_from(ssid).unwrap()));
        self.push_write(ChannelWrite::Passphrase(
            heapless::String::try_from(passphrase).unwrap(),
        ));
        self.push_write(ChannelWrite::Endpoint(Endpoint::try_from(endpoint).unwrap()));
    }

    pub fn last_status(&self) -> Option<&ChannelStatus> {
        self.published.last()
    }
}

impl ConfigChannel for MockChannel {
    fn open(&mut self) {
        self.is_open = true;
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn poll_write(&mut self) -> Option<ChannelWrite> {
        self.pending.pop_front()
    }

    fn publish(&mut self, status: &ChannelStatus) {
        self.published.push(status.clone());
    }

    fn take_reset_request(&mut self) -> bool {
        core::mem::take(&mut self.reset_requested)
    }
}
