//! Capability Adapter — unprefixed facade over vendor-variant platform APIs.
//!
//! Probes the unprefixed API first, then the vendor-prefixed variants in a
//! fixed order, once per capability at startup. Callers see a single
//! unprefixed surface; an absent capability is reported as unsupported, it
//! never throws.

use crate::error::{ProctorError, ProctorResult};
use crate::platform::{ApiVariant, DomFeature, PlatformDom};
use std::sync::Arc;
use tracing::debug;

/// The negotiated capability surface. Holds no state beyond the variants
/// selected at construction; all side effects are platform calls.
pub struct CapabilityAdapter {
    dom: Arc<dyn PlatformDom>,
    fullscreen: Option<ApiVariant>,
    visibility: Option<ApiVariant>,
}

impl CapabilityAdapter {
    /// Probe the platform once and fix the variant for each capability.
    pub fn negotiate(dom: Arc<dyn PlatformDom>) -> Self {
        let fullscreen = Self::select(&*dom, DomFeature::Fullscreen);
        let visibility = Self::select(&*dom, DomFeature::VisibilityApi);
        debug!(fullscreen = ?fullscreen, visibility = ?visibility, "Capability negotiation complete");
        Self { dom, fullscreen, visibility }
    }

    fn select(dom: &dyn PlatformDom, feature: DomFeature) -> Option<ApiVariant> {
        ApiVariant::NEGOTIATION_ORDER
            .iter()
            .copied()
            .find(|&variant| dom.supports(feature, variant))
    }

    pub fn supports_fullscreen(&self) -> bool {
        self.fullscreen.is_some()
    }

    pub fn supports_visibility_api(&self) -> bool {
        self.visibility.is_some()
    }

    /// Request full-screen on the exam container.
    pub fn request_fullscreen(&self) -> ProctorResult<()> {
        let variant = self
            .fullscreen
            .ok_or(ProctorError::CapabilityUnsupported("fullscreen"))?;
        self.dom.request_fullscreen(variant)
    }

    /// Exit full-screen if an element currently occupies it.
    pub fn exit_fullscreen(&self) -> ProctorResult<()> {
        let variant = self
            .fullscreen
            .ok_or(ProctorError::CapabilityUnsupported("fullscreen"))?;
        if self.dom.fullscreen_element_present(variant) {
            self.dom.exit_fullscreen(variant)?;
        }
        Ok(())
    }

    /// Whether some element is currently full-screen.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
            .map(|v| self.dom.fullscreen_element_present(v))
            .unwrap_or(false)
    }

    /// Whether the document is visible. Without a visibility API the
    /// document is assumed visible (the signal simply never fires).
    pub fn is_document_visible(&self) -> bool {
        self.visibility
            .map(|v| self.dom.is_document_visible(v))
            .unwrap_or(true)
    }

    /// DOM event name for full-screen changes under the selected variant.
    pub fn fullscreen_change_event(&self) -> Option<&'static str> {
        self.fullscreen.map(|v| match v {
            ApiVariant::Unprefixed => "fullscreenchange",
            ApiVariant::Webkit => "webkitfullscreenchange",
            ApiVariant::Moz => "mozfullscreenchange",
            ApiVariant::Ms => "MSFullscreenChange",
        })
    }

    /// DOM event name for visibility changes under the selected variant.
    pub fn visibility_change_event(&self) -> Option<&'static str> {
        self.visibility.map(|v| match v {
            ApiVariant::Unprefixed => "visibilitychange",
            ApiVariant::Webkit => "webkitvisibilitychange",
            ApiVariant::Moz => "mozvisibilitychange",
            ApiVariant::Ms => "msvisibilitychange",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProctorError;
    use parking_lot::RwLock;

    /// Platform stub supporting a configurable set of (feature, variant)
    /// pairs.
    struct VariantDom {
        pairs: Vec<(DomFeature, ApiVariant)>,
        fullscreen_engaged: RwLock<bool>,
    }

    impl VariantDom {
        fn new(pairs: Vec<(DomFeature, ApiVariant)>) -> Self {
            Self { pairs, fullscreen_engaged: RwLock::new(false) }
        }
    }

    impl PlatformDom for VariantDom {
        fn supports(&self, feature: DomFeature, variant: ApiVariant) -> bool {
            self.pairs.iter().any(|&(f, v)| f == feature && v == variant)
        }
        fn request_fullscreen(&self, _variant: ApiVariant) -> ProctorResult<()> {
            *self.fullscreen_engaged.write() = true;
            Ok(())
        }
        fn exit_fullscreen(&self, _variant: ApiVariant) -> ProctorResult<()> {
            *self.fullscreen_engaged.write() = false;
            Ok(())
        }
        fn fullscreen_element_present(&self, _variant: ApiVariant) -> bool {
            *self.fullscreen_engaged.read()
        }
        fn is_document_visible(&self, _variant: ApiVariant) -> bool {
            true
        }
        fn outer_size(&self) -> (u32, u32) { (1920, 1080) }
        fn inner_size(&self) -> (u32, u32) { (1920, 1080) }
        fn timed_log_ms(&self) -> f64 { 0.1 }
    }

    #[test]
    fn test_unprefixed_wins_over_prefixed() {
        let dom = Arc::new(VariantDom::new(vec![
            (DomFeature::Fullscreen, ApiVariant::Webkit),
            (DomFeature::Fullscreen, ApiVariant::Unprefixed),
        ]));
        let adapter = CapabilityAdapter::negotiate(dom);
        assert_eq!(adapter.fullscreen_change_event(), Some("fullscreenchange"));
    }

    #[test]
    fn test_prefixed_fallback_in_fixed_order() {
        let dom = Arc::new(VariantDom::new(vec![
            (DomFeature::Fullscreen, ApiVariant::Ms),
            (DomFeature::Fullscreen, ApiVariant::Moz),
        ]));
        let adapter = CapabilityAdapter::negotiate(dom);
        // Moz precedes Ms in the probe order.
        assert_eq!(adapter.fullscreen_change_event(), Some("mozfullscreenchange"));
    }

    #[test]
    fn test_unsupported_reports_instead_of_throwing() {
        let dom = Arc::new(VariantDom::new(vec![]));
        let adapter = CapabilityAdapter::negotiate(dom);
        assert!(!adapter.supports_fullscreen());
        assert!(!adapter.supports_visibility_api());
        assert_eq!(
            adapter.request_fullscreen(),
            Err(ProctorError::CapabilityUnsupported("fullscreen"))
        );
        // No visibility API: the document is assumed visible.
        assert!(adapter.is_document_visible());
    }

    #[test]
    fn test_exit_fullscreen_noop_when_not_engaged() {
        let dom = Arc::new(VariantDom::new(vec![(DomFeature::Fullscreen, ApiVariant::Unprefixed)]));
        let adapter = CapabilityAdapter::negotiate(dom);
        assert!(adapter.exit_fullscreen().is_ok());
        adapter.request_fullscreen().unwrap();
        assert!(adapter.is_fullscreen());
        adapter.exit_fullscreen().unwrap();
        assert!(!adapter.is_fullscreen());
    }
}
