//! Drawer and dashboard/organizer motion.
//!
//! Two independent axes. The horizontal one follows a pan 1:1 and
//! springs to an endpoint on release; the vertical one only moves on
//! explicit navigation and uses a fixed-duration ease-out.

use std::time::Duration;

use tracing::debug;

use crate::config::Settings;
use crate::motion::{Easing, Motion, Spring, Timing, interpolate_clamped};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerEndpoint {
    Closed,
    Open,
}

/// Which pointer events the dashboard layer takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvents {
    /// Resting on the dashboard.
    All,
    /// Mid-transition: only regions outside the moving content.
    OutsideContent,
    /// Organizer shown: only the reserved handle.
    HandleOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    Content,
    Handle,
    Outside,
}

impl PointerEvents {
    pub fn accepts(self, region: HitRegion) -> bool {
        match self {
            PointerEvents::All => true,
            PointerEvents::OutsideContent => region == HitRegion::Outside,
            PointerEvents::HandleOnly => region == HitRegion::Handle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewTransition {
    drawer_width: f32,
    screen_height: f32,
    corner_radius: f32,
    drawer: Spring,
    /// Drawer value when the current pan began.
    pan_start: Option<f32>,
    vertical: Timing,
}

impl ViewTransition {
    pub fn new(settings: &Settings) -> Self {
        Self {
            drawer_width: settings.drawer_width(),
            screen_height: settings.screen_height,
            corner_radius: settings.drawer_corner_radius,
            drawer: Spring::new(0.0, settings.spring),
            pan_start: None,
            vertical: Timing::new(0.0, settings.vertical_duration, Easing::EaseOut),
        }
    }

    /// Back to rest on both axes, as on mount.
    pub fn reset(&mut self) {
        self.drawer.snap(0.0);
        self.pan_start = None;
        self.vertical.snap(0.0);
    }

    pub fn drawer_width(&self) -> f32 {
        self.drawer_width
    }

    pub fn is_panning(&self) -> bool {
        self.pan_start.is_some()
    }

    /// Takes over the drawer from wherever it is, mid-spring included.
    pub fn pan_begin(&mut self) {
        let start = self.drawer.value();
        self.drawer.snap(start);
        self.pan_start = Some(start);
        debug!(start, "pan begin");
    }

    /// `translation_x` is the total horizontal travel since the pan began.
    pub fn pan_update(&mut self, translation_x: f32) {
        let Some(start) = self.pan_start else {
            return;
        };
        let next = (start + translation_x).clamp(-self.drawer_width, 0.0);
        self.drawer.snap(next);
    }

    /// Releases the pan. The midpoint itself resolves to closed.
    pub fn pan_end(&mut self) -> Option<DrawerEndpoint> {
        self.pan_start.take()?;
        let endpoint = release_endpoint(self.drawer.value(), self.drawer_width);
        let target = match endpoint {
            DrawerEndpoint::Closed => 0.0,
            DrawerEndpoint::Open => -self.drawer_width,
        };
        debug!(from = self.drawer.value(), target, "pan end");
        self.drawer.set(target);
        Some(endpoint)
    }

    pub fn drawer_progress(&self) -> f32 {
        self.drawer.value()
    }

    pub fn drawer_settled(&self) -> bool {
        !self.is_panning() && self.drawer.is_settled()
    }

    pub fn corner_radius(&self) -> f32 {
        interpolate_clamped(
            self.drawer.value(),
            (-self.drawer_width, 0.0),
            (self.corner_radius, 0.0),
        )
    }

    pub fn navigate_to_organizer(&mut self) {
        debug!("navigate to organizer");
        self.vertical.set(-self.screen_height);
    }

    pub fn navigate_to_dashboard(&mut self) {
        debug!("navigate to dashboard");
        self.vertical.set(0.0);
    }

    pub fn vertical_progress(&self) -> f32 {
        self.vertical.value()
    }

    pub fn organizer_shown(&self) -> bool {
        self.vertical.is_settled() && self.vertical.value() != 0.0
    }

    pub fn dashboard_pointer_events(&self) -> PointerEvents {
        if !self.vertical.is_settled() {
            PointerEvents::OutsideContent
        } else if self.vertical.value() == 0.0 {
            PointerEvents::All
        } else {
            PointerEvents::HandleOnly
        }
    }

    pub fn is_idle(&self) -> bool {
        self.drawer_settled() && self.vertical.is_settled()
    }

    /// One frame. A drawer under an active pan is not integrated.
    pub fn tick(&mut self, dt: Duration) {
        if !self.is_panning() {
            self.drawer.tick(dt);
        }
        self.vertical.tick(dt);
    }
}

/// Endpoint a release at `progress` settles to. Strictly past the
/// midpoint opens; the midpoint closes.
pub fn release_endpoint(progress: f32, drawer_width: f32) -> DrawerEndpoint {
    if progress < -drawer_width / 2.0 {
        DrawerEndpoint::Open
    } else {
        DrawerEndpoint::Closed
    }
}
