//! `IntersectionObserver` backend for the scroll spy.

use js_sys::Array;
use rw_behaviors::{VisibilityEntry, VisibilityObserver};
use wasm_bindgen::prelude::*;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

type Callback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// Forwards intersection batches to `sink` in the order the browser reports
/// them.
///
/// If the browser refuses to create the observer, the failure is logged and
/// nothing is ever reported.
pub struct IntersectionVisibility {
    observer: Option<IntersectionObserver>,
    callback: Option<Callback>,
}

impl IntersectionVisibility {
    pub fn new<F>(threshold: f64, sink: F) -> Self
    where
        F: Fn(&[VisibilityEntry<Element>]) + 'static,
    {
        let callback: Callback = Closure::new(move |entries: Array, _: IntersectionObserver| {
            let batch: Vec<VisibilityEntry<Element>> = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|entry| {
                    visibility_entry(
                        entry.target(),
                        entry.intersection_ratio(),
                        entry.is_intersecting(),
                    )
                })
                .collect();
            sink(&batch);
        });

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(threshold));

        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options) {
            Ok(observer) => Self {
                observer: Some(observer),
                callback: Some(callback),
            },
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to create IntersectionObserver");
                web_sys::console::warn_2(&JsValue::from_str("Scroll spy disabled:"), &e);
                Self {
                    observer: None,
                    callback: None,
                }
            }
        }
    }
}

impl VisibilityObserver<Element> for IntersectionVisibility {
    fn observe(&mut self, target: &Element) {
        if let Some(observer) = &self.observer {
            observer.observe(target);
        }
    }

    fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.callback = None;
    }
}

/// Normalize one browser report. Ratios can overshoot `1.0` by rounding.
fn visibility_entry<N>(target: N, ratio: f64, is_intersecting: bool) -> VisibilityEntry<N> {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    VisibilityEntry {
        target,
        ratio,
        is_intersecting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_visibility_entry_keeps_browser_values() {
        assert_eq!(
            visibility_entry("usage", 0.75, true),
            VisibilityEntry {
                target: "usage",
                ratio: 0.75,
                is_intersecting: true,
            }
        );
    }

    #[test]
    fn test_visibility_entry_clamps_ratio() {
        let ratios: Vec<f64> = [1.000_000_1, -0.1, f64::NAN]
            .into_iter()
            .map(|ratio| visibility_entry("a", ratio, true).ratio)
            .collect();
        assert!((ratios[0] - 1.0).abs() < f64::EPSILON);
        assert!(ratios[1].abs() < f64::EPSILON);
        assert!(ratios[2].abs() < f64::EPSILON);
    }

    #[test]
    fn test_visibility_entry_edge_contact() {
        // Adjacent to the viewport: intersecting with nothing visible.
        let entry = visibility_entry("a", 0.0, true);
        assert!(entry.is_intersecting);
        assert!(entry.ratio.abs() < f64::EPSILON);
    }
}
