//! Matches view: ranked candidates, filtered locally then offset-sliced

use imp_common::contact::MatchCandidate;
use imp_common::{MembershipMap, Result};

use super::{FetchContext, MatchMeta, MatchesRequest, ViewPage};
use crate::pagination::{calculate_window, PageTotal};

pub(super) async fn reconcile_matches(
    ctx: &FetchContext,
    request: &MatchesRequest,
    membership: &MembershipMap,
) -> Result<ViewPage> {
    if request.seed_id.trim().is_empty() {
        return Ok(ViewPage::empty(0, PageTotal::Exact(0)));
    }

    let key = format!(
        "{}|{}|{}",
        request.seed_id, request.target_type, request.limit
    );
    let response = ctx
        .cached(key, || {
            ctx.sources
                .matches
                .matches(&request.seed_id, request.target_type, request.limit)
        })
        .await?;

    let candidates: Vec<MatchCandidate> = response
        .candidates
        .into_iter()
        .filter(|candidate| {
            request.filter.matches(&candidate.contact)
                && request
                    .filter
                    .matches_status(membership, &candidate.contact.id)
        })
        .collect();

    let window = calculate_window(candidates.len(), request.page, request.page_size);
    let total = PageTotal::Exact(candidates.len());
    let has_more = window.page + 1 < window.total_pages;

    let mut page = ViewPage::empty(window.page, total);
    page.has_more = has_more;
    for candidate in candidates
        .into_iter()
        .skip(window.offset)
        .take(request.page_size)
    {
        page.match_meta.insert(
            candidate.contact.id.clone(),
            MatchMeta {
                score: candidate.score,
                overlaps: candidate.overlaps,
            },
        );
        page.contacts.push(candidate.contact);
    }
    Ok(page)
}
