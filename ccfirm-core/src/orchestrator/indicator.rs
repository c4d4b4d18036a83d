//! Status indicators
//!
//! Drawn with plain pixel patterns so they need no font and never depend on
//! fetched content. The reconnecting badge is a small corner mark refreshed
//! partially; setup and halt marks replace the whole screen.

use ccfirm_hal::FlashStorage;

use crate::fetch::{FetchResult, FetchStatus};
use crate::orchestrator::DeviceContext;
use crate::scheduler::RefreshKind;
use crate::traits::{Clock, ConfigChannel, EpdPanel, EpdPanelExt, Network, Region};

/// Reconnecting badge edge length
const BADGE_SIZE: u16 = 32;

/// Gap between the badge and the screen edge
const BADGE_MARGIN: u16 = 4;

/// Setup/halt mark edge length
const MARK_SIZE: u16 = 96;

/// Indicator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    /// Waiting for the user to configure the device
    Setup,
    /// Offline or failing; retrying with backoff
    Reconnecting,
    /// Stopped until factory reset
    Halted,
}

/// Bottom-right badge rectangle
pub(crate) fn badge_region(screen: Region) -> Region {
    let size = BADGE_SIZE.min(screen.width).min(screen.height);
    let margin = BADGE_MARGIN
        .min(screen.width - size)
        .min(screen.height - size);
    Region::new(
        screen.x + screen.width - size - margin,
        screen.y + screen.height - size - margin,
        size,
        size,
    )
}

fn centered(screen: Region, size: u16) -> Region {
    let width = size.min(screen.width);
    let height = size.min(screen.height);
    Region::new(
        screen.x + (screen.width - width) / 2,
        screen.y + (screen.height - height) / 2,
        width,
        height,
    )
}

/// Framed horizontal bar
fn draw_reconnecting<P: EpdPanel>(panel: &mut P, badge: Region) {
    panel.fill_region(badge, false);
    panel.draw_frame(badge, 2);
    let bar = Region::new(
        badge.x + badge.width / 4,
        badge.y + badge.height / 2 - badge.height.min(4) / 2,
        badge.width / 2,
        badge.height.min(4),
    );
    panel.fill_region(bar, true);
}

/// Framed checkerboard
fn draw_setup<P: EpdPanel>(panel: &mut P, mark: Region) {
    panel.draw_frame(mark, 4);
    for dy in 8..mark.height.saturating_sub(8) {
        for dx in 8..mark.width.saturating_sub(8) {
            if ((dx / 8) + (dy / 8)) % 2 == 0 {
                panel.set_pixel(mark.x + dx, mark.y + dy, true);
            }
        }
    }
}

/// Framed diagonal cross
fn draw_halted<P: EpdPanel>(panel: &mut P, mark: Region) {
    panel.draw_frame(mark, 4);
    let side = mark.width.min(mark.height);
    for d in 0..side {
        for t in 0..3u16 {
            let x = (d + t).min(side - 1);
            panel.set_pixel(mark.x + x, mark.y + d, true);
            panel.set_pixel(mark.x + side - 1 - x, mark.y + d, true);
        }
    }
}

impl<'a, P, N, S, C, K> DeviceContext<'a, P, N, S, C, K>
where
    P: EpdPanel,
    N: Network,
    S: FlashStorage,
    C: ConfigChannel,
    K: Clock,
{
    /// Draw and refresh an indicator
    ///
    /// Every indicator leaves the screen content in doubt, so the next plan
    /// is a full refresh.
    pub(crate) async fn show_indicator(&mut self, indicator: Indicator) {
        let screen = self.registry.screen();
        match indicator {
            Indicator::Reconnecting => {
                let badge = badge_region(screen);
                draw_reconnecting(&mut self.panel, badge);
                self.panel.apply_partial_refresh(badge).await;
                self.cycle.record_partial_refreshes(1);
            }
            Indicator::Setup | Indicator::Halted => {
                self.panel.fill_region(screen, false);
                let mark = centered(screen, MARK_SIZE);
                if indicator == Indicator::Setup {
                    draw_setup(&mut self.panel, mark);
                } else {
                    draw_halted(&mut self.panel, mark);
                }
                self.panel.apply_full_refresh().await;
                self.registry.clear_applied();
            }
        }
        debug!("Indicator {} shown", indicator);
        self.cycle.force_full = true;
        self.indicator = Some(indicator);
    }

    /// Erase the indicator before drawing `results`
    ///
    /// The badge covers parts of other zones, so it is only erased once every
    /// zone beneath it is about to be redrawn. Returns true while the badge
    /// has to stay on screen.
    pub(crate) fn clear_indicator(&mut self, kind: RefreshKind, results: &[FetchResult]) -> bool {
        let screen = self.registry.screen();
        match self.indicator {
            Some(Indicator::Reconnecting) => {
                let badge = badge_region(screen);
                let redrawn = |index: usize| {
                    results.iter().any(|result| {
                        result.zone_index == index && matches!(result.status, FetchStatus::Ok(_))
                    })
                };
                let covered = self
                    .registry
                    .all_zones()
                    .enumerate()
                    .filter(|(_, zone)| zone.region().overlaps(&badge))
                    .all(|(index, _)| redrawn(index));
                if !covered {
                    debug!("Badge kept: zones beneath it not redrawn");
                    return true;
                }
                self.panel.fill_region(badge, false);
            }
            Some(Indicator::Setup | Indicator::Halted) if kind == RefreshKind::Full => {
                self.panel.fill_region(screen, false);
            }
            _ => return false,
        }
        self.indicator = None;
        false
    }

    /// Draw the badge again over a zone that was just blitted
    pub(crate) fn restore_badge(&mut self, zone: Region) {
        let badge = badge_region(self.registry.screen());
        if zone.overlaps(&badge) {
            draw_reconnecting(&mut self.panel, badge);
        }
    }
}
