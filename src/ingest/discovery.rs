//! Sheet discovery by signature probing
//!
//! The spreadsheet answers a query for *any* sheet name. Names that do not
//! exist silently fall back to the default view, so "Order 2031" would look
//! like a real sheet and double-count the default sheet's rows. Instead of
//! trusting names, every candidate is probed and candidates are grouped by
//! the signature the endpoint returns:
//!
//! ```text
//! probe(<default>)      -> sig D
//! probe("Order 2019")   -> sig A   ┐
//! ...                              ├─ group by sig
//! probe("Order 2028")   -> sig D   ┘
//!
//! group D (aliases of the default view) -> confirm via gid probe,
//!                                          keep newest non-future year
//! every other group                     -> keep its first name
//! ```
//!
//! Two distinct sheets whose one-row probes happen to share a signature are
//! merged. That risk is accepted; the signature is what the endpoint offers.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::source::{Selector, SheetSource, SourceError};
use super::types::SheetDescriptor;

/// Years probed relative to the current year
const YEARS_BACK: i32 = 7;
const YEARS_AHEAD: i32 = 2;

/// Inputs that vary per deployment and per run
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Prefix of every year-sheet name ("Order " -> "Order 2025")
    pub sheet_prefix: String,
    /// gid of the sheet the default view is expected to be
    pub target_gid: String,
    pub current_year: i32,
}

/// Candidate years, oldest first: seven back through two ahead
pub fn candidate_years(current_year: i32) -> Vec<i32> {
    (current_year - YEARS_BACK..=current_year + YEARS_AHEAD).collect()
}

pub fn sheet_name_for_year(prefix: &str, year: i32) -> String {
    format!("{}{}", prefix, year)
}

/// Group probed names by signature; names keep their probe order within a group
pub fn group_by_signature(probed: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, sig) in probed {
        groups.entry(sig.clone()).or_default().push(name.clone());
    }
    groups
}

/// Newest name in an alias group whose year is not in the future
pub fn pick_default_alias(names: &[String], current_year: i32) -> Option<String> {
    names
        .iter()
        .map(|name| SheetDescriptor::new(name.as_str(), current_year))
        .filter(|sheet| sheet.year <= current_year)
        .max_by_key(|sheet| sheet.year)
        .map(|sheet| sheet.name)
}

/// Probe the default view and every candidate name concurrently.
///
/// Returns the default signature and `(name, signature)` pairs in candidate
/// order. The first failed probe aborts the rest.
async fn probe_candidates(
    source: Arc<dyn SheetSource>,
    names: &[String],
) -> Result<(String, Vec<(String, String)>), SourceError> {
    let mut probes = JoinSet::new();

    let default_source = source.clone();
    probes.spawn(async move { (None, default_source.probe_signature(&Selector::Default).await) });

    for (index, name) in names.iter().enumerate() {
        let source = source.clone();
        let selector = Selector::Sheet(name.clone());
        probes.spawn(async move { (Some(index), source.probe_signature(&selector).await) });
    }

    let mut default_sig = None;
    let mut probed: Vec<(usize, String)> = Vec::with_capacity(names.len());

    while let Some(joined) = probes.join_next().await {
        let (slot, result) = joined.map_err(|e| SourceError::Aborted(e.to_string()))?;
        let sig = result?;
        match slot {
            None => default_sig = Some(sig),
            Some(index) => probed.push((index, sig)),
        }
    }

    let default_sig =
        default_sig.ok_or_else(|| SourceError::Aborted("default probe did not complete".to_string()))?;

    probed.sort_by_key(|(index, _)| *index);
    let pairs = probed
        .into_iter()
        .map(|(index, sig)| (names[index].clone(), sig))
        .collect();

    Ok((default_sig, pairs))
}

/// Determine the distinct year-sheets behind the candidate names.
///
/// The result is sorted lexicographically. Any probe failure propagates and
/// discovery yields nothing for the run.
pub async fn discover_sheets(
    source: Arc<dyn SheetSource>,
    options: &DiscoveryOptions,
) -> Result<Vec<String>, SourceError> {
    let names: Vec<String> = candidate_years(options.current_year)
        .into_iter()
        .map(|year| sheet_name_for_year(&options.sheet_prefix, year))
        .collect();

    log::info!("🔍 Probing {} candidate sheets + default view", names.len());

    let (default_sig, probed) = probe_candidates(source.clone(), &names).await?;
    let groups = group_by_signature(&probed);

    let mut chosen = Vec::new();
    for (sig, members) in &groups {
        if *sig != default_sig {
            log::debug!("   ├─ sig {} -> {:?} (distinct sheet)", sig, members);
            chosen.push(members[0].clone());
            continue;
        }

        log::debug!("   ├─ sig {} -> {:?} (aliases of default view)", sig, members);

        let gid_sig = source
            .probe_signature(&Selector::Gid(options.target_gid.clone()))
            .await?;

        if gid_sig != default_sig {
            log::warn!(
                "⚠️  Default view does not match gid {}, skipping alias group {:?}",
                options.target_gid,
                members
            );
            continue;
        }

        match pick_default_alias(members, options.current_year) {
            Some(name) => chosen.push(name),
            None => log::warn!("⚠️  Alias group {:?} has only future years, skipping", members),
        }
    }

    chosen.sort();
    log::info!("✅ Discovered {} sheets: {:?}", chosen.len(), chosen);

    Ok(chosen)
}
