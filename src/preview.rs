//! HTML preview of a developed plate.
//!
//! Renders one self-contained page with [maud](https://maud.lambda.xyz/):
//! images are embedded as data URIs and the stylesheet and script are
//! compiled into the binary, so the file can be opened straight from disk.
//!
//! The page has two views of the same pair of images:
//!
//! - **Side by Side**: reference portrait and framed plate.
//! - **Revealer**: the plate laid over the portrait, clipped with
//!   [`reveal_clip`]; `reveal.js` updates the clip as the pointer moves.
//!
//! Darkroom adjustments are applied as a CSS filter on the plate only. The
//! embedded plate bytes are the unmodified generated image.

use crate::capture::ImagePayload;
use crate::darkroom::Adjustments;
use crate::session::GenerationResult;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../static/preview.css");
const JS: &str = include_str!("../static/reveal.js");

/// Starting divider position for the revealer, in percent.
pub const DEFAULT_REVEAL_POSITION: f64 = 50.0;

/// Fractal noise, layered over the plate when grain is on.
const GRAIN_SVG: &str = "data:image/svg+xml;utf8,\
<svg xmlns='http://www.w3.org/2000/svg' width='200' height='200'>\
<filter id='n'><feTurbulence type='fractalNoise' baseFrequency='0.9' numOctaves='3' stitchTiles='stitch'/></filter>\
<rect width='100%' height='100%' filter='url(%23n)'/></svg>";

/// CSS `clip-path` revealing the left `position` percent of the plate.
///
/// `position` is clamped to `0..=100`; NaN counts as 0.
pub fn reveal_clip(position: f64) -> String {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 100.0)
    };
    format!("inset(0 {}% 0 0)", 100.0 - position)
}

fn grain_overlay(on: bool) -> Markup {
    html! {
        @if on {
            div.grain style={ "background-image: url(\"" (GRAIN_SVG) "\")" } {}
        }
    }
}

fn recent_plates(history: &[GenerationResult], current: &GenerationResult) -> Markup {
    html! {
        @if !history.is_empty() {
            section.recent-plates {
                h2 { "Recent Plates" }
                ol {
                    @for entry in history {
                        li.current[entry == current] {
                            img src=(entry.image.to_data_uri()) alt=(entry.era.title);
                            div { (entry.era.title) }
                        }
                    }
                }
            }
        }
    }
}

/// Render the result page for `result`, developed from `source`.
pub fn render_result_page(
    source: &ImagePayload,
    result: &GenerationResult,
    adjustments: &Adjustments,
    history: &[GenerationResult],
) -> Markup {
    let source_uri = source.to_data_uri();
    let plate_uri = result.image.to_data_uri();
    let filter = format!("filter: {}", adjustments.css_filter());
    let clip = format!("clip-path: {}", reveal_clip(DEFAULT_REVEAL_POSITION));
    let handle = format!("left: {DEFAULT_REVEAL_POSITION}%");

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "ChronoSnap: " (result.era.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                main {
                    header.plate-header {
                        h1 { (result.era.title) }
                        p.status { "Development Complete" }
                    }
                    nav.view-modes {
                        button.active type="button" data-view="split" { "Side by Side" }
                        button type="button" data-view="compare" { "Revealer" }
                    }
                    div.split data-view-panel="split" {
                        figure.print.reference {
                            div.frame { img src=(source_uri) alt="Original"; }
                            figcaption { "Reference" }
                        }
                        figure.print.generated {
                            div.frame {
                                img src=(plate_uri) alt="Generated" style=(filter);
                                (grain_overlay(adjustments.grain()))
                            }
                            figcaption { "Figure 1.A" }
                        }
                    }
                    div.revealer.hidden data-view-panel="compare" {
                        img src=(source_uri) alt="Original";
                        div.reveal-layer style=(clip) {
                            img src=(plate_uri) alt="Result" style=(filter);
                            (grain_overlay(adjustments.grain()))
                        }
                        div.reveal-handle style=(handle) {}
                    }
                    p.prompt { (result.original_prompt) }
                    (recent_plates(history, result))
                }
                script { (PreEscaped(JS)) }
            }
        }
    }
}
