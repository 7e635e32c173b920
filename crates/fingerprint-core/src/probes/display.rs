// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{
    DataSource, DisplayMetrics, DisplayPanel, Fields, FieldsExt, Probe, ProbeError, Value,
};

use super::DISPLAY_INFO;

/// `DisplayMetrics.DENSITY_DEFAULT`
const BASELINE_DPI: f64 = 160.0;

/// Screen geometry, density and panel capabilities.
pub struct DisplayInfoProbe;

#[async_trait]
impl Probe for DisplayInfoProbe {
    fn name(&self) -> &str {
        DISPLAY_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        Ok(display_fields(&device.display_metrics()?))
    }
}

pub fn display_fields(metrics: &DisplayMetrics) -> Fields {
    let mut fields = Fields::new();
    fields.put("widthPixels", metrics.width_pixels);
    fields.put("heightPixels", metrics.height_pixels);
    fields.put("density", metrics.density);
    fields.put("densityDpi", metrics.density_dpi);
    fields.put("xdpi", metrics.xdpi);
    fields.put("ydpi", metrics.ydpi);

    // without window bounds the resource metrics stand in
    fields.put(
        "realWidthPixels",
        metrics.real_width_pixels.unwrap_or(metrics.width_pixels),
    );
    fields.put(
        "realHeightPixels",
        metrics.real_height_pixels.unwrap_or(metrics.height_pixels),
    );
    fields.put("realDensity", metrics.density);
    fields.put(
        "realDensityDpi",
        (metrics.density * BASELINE_DPI).round() as i64,
    );

    fields.put("screenWidthDp", metrics.screen_width_dp);
    fields.put("screenHeightDp", metrics.screen_height_dp);
    fields.put("smallestScreenWidthDp", metrics.smallest_screen_width_dp);
    fields.put("densityDpiConfig", metrics.density_dpi_config);
    fields.put("fontScale", metrics.font_scale);
    fields.put("uiModeNight", metrics.ui_mode_night);
    fields.put("locales", metrics.locales.clone());

    if let Some(panel) = &metrics.panel {
        put_panel(&mut fields, panel);
    }
    fields
}

fn put_panel(fields: &mut Fields, panel: &DisplayPanel) {
    fields.put("refreshRate", panel.refresh_rate);
    fields.put("flags", panel.flags);
    fields.put("isHdr", panel.is_hdr);
    fields.put("isWideColorGamut", panel.is_wide_color_gamut);
    if let Some(max) = panel.hdr_max_luminance {
        fields.put("hdrMaxLuminance", max);
    }
    if let Some(min) = panel.hdr_min_luminance {
        fields.put("hdrMinLuminance", min);
    }
    let rates: Vec<Value> = distinct_rates(&panel.mode_refresh_rates)
        .into_iter()
        .map(Value::from)
        .collect();
    fields.put("supportedRefreshRates", rates);
}

/// Ascending, with exact duplicates removed.
fn distinct_rates(rates: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = rates.iter().copied().filter(|r| r.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted
}
