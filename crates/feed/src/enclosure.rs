// ABOUTME: Picks the single downloadable media reference for a feed item.
// ABOUTME: Reads plain <enclosure> elements and chooses among competing Media RSS <media:content> renditions.

use crate::duration_parse::{parse_itunes_duration, parse_seconds};
use crate::error::FeedError;
use crate::models::FeedEnclosure;
use crate::query::Namespaces;
use crate::xml::Node;

/// Reads the item's `<enclosure>` element.
///
/// The first enclosure carrying a non-empty `url` is used; without one the
/// item has no simple enclosure. Size, type, iTunes duration and iTunes
/// keywords are filled from the same element and item.
pub fn parse_enclosure(ns: &Namespaces, item: Node<'_>) -> Result<Option<FeedEnclosure>, FeedError> {
    let mut chosen = None;
    for node in ns.select(item, "enclosure")? {
        if let Some(url) = ns.non_empty_text(node, "@url")? {
            chosen = Some((node, url));
            break;
        }
    }
    let Some((node, url)) = chosen else {
        return Ok(None);
    };

    let duration = ns
        .text(item, "itunes:duration")?
        .map(|d| parse_itunes_duration(&d))
        .unwrap_or_default();

    Ok(Some(FeedEnclosure {
        url,
        mime_type: ns.non_empty_text(node, "@type")?,
        file_size: clamp_size(ns.int(node, "@length")?),
        duration,
        keywords: ns.non_empty_text(item, "itunes:keywords")?,
    }))
}

/// Chooses the best `media:content` child of `parent`.
///
/// A candidate is eligible when it has a non-empty `url` and its `expression`
/// is absent or `full`, which rules out samples and trailers. The eligible
/// candidate with the highest `bitrate` wins; on equal bitrates the earliest
/// one is kept. Keywords come from `item`, not from the candidate.
pub fn select_media_content(
    ns: &Namespaces,
    parent: Node<'_>,
    item: Node<'_>,
) -> Result<Option<FeedEnclosure>, FeedError> {
    let mut best: Option<(Node<'_>, String, i32)> = None;

    for candidate in ns.select(parent, "media:content")? {
        let expression = ns.text(candidate, "@expression")?;
        if !matches!(expression.as_deref(), None | Some("") | Some("full")) {
            continue;
        }
        let Some(url) = ns.non_empty_text(candidate, "@url")? else {
            continue;
        };

        // Bitrates outside the 32-bit range read as 0.
        let bitrate = ns
            .text(candidate, "@bitrate")?
            .and_then(|b| b.parse::<i32>().ok())
            .unwrap_or(0);
        if best.as_ref().map_or(true, |(_, _, max)| bitrate > *max) {
            best = Some((candidate, url, bitrate));
        }
    }

    let Some((node, url, _)) = best else {
        return Ok(None);
    };

    // Atom parsers do not bind the iTunes namespace.
    let keywords = match ns.resolve("itunes") {
        Some(_) => ns.non_empty_text(item, "itunes:keywords")?,
        None => None,
    };

    Ok(Some(FeedEnclosure {
        url,
        mime_type: ns.non_empty_text(node, "@type")?,
        file_size: clamp_size(ns.int(node, "@fileSize")?),
        duration: ns
            .text(node, "@duration")?
            .map(|d| parse_seconds(&d))
            .unwrap_or_default(),
        keywords,
    }))
}

fn clamp_size(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
