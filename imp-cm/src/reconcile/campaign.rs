//! In-campaign view
//!
//! Remote campaign-contacts pages, unioned on the terminal page with
//! membership entries the remote listing never returned.

use std::cmp::Ordering;
use std::collections::HashSet;

use imp_common::contact::{CampaignSortField, Contact, SortDirection};
use imp_common::{MembershipMap, Result};
use tracing::{debug, warn};

use super::{CampaignRequest, FetchContext, ViewPage};
use crate::cache::CacheRegion;
use crate::pagination::{PageCursor, PageTotal};
use crate::sources::CampaignContactsQuery;

pub(super) async fn reconcile_campaign(
    ctx: &FetchContext,
    request: &CampaignRequest,
    membership: &MembershipMap,
) -> Result<ViewPage> {
    if request.owner_id.trim().is_empty() {
        return Ok(ViewPage::empty(request.page, PageTotal::Exact(0)));
    }

    let (records, has_more) = match &request.cursor {
        PageCursor::Undefined => {
            debug!(page = request.page, "Cursor undefined, no remote campaign page");
            (Vec::new(), false)
        }
        cursor => {
            let query = CampaignContactsQuery {
                limit: request.page_size,
                start_after: cursor.start_after().map(str::to_string),
                order_by: request.order_by,
                direction: request.direction,
            };
            let key = format!(
                "{}|{}|{}|{}|{}",
                request.owner_id,
                query.limit,
                query.start_after.as_deref().unwrap_or(""),
                query.order_by.as_str(),
                query.direction.as_str()
            );
            let page = ctx
                .cached(key, || {
                    ctx.sources
                        .contacts
                        .campaign_contacts(&request.owner_id, &query)
                })
                .await?;
            (page.data, page.pagination.has_more)
        }
    };

    let remote_ids: Vec<String> = records.iter().map(|r| r.contact.id.clone()).collect();
    let last_id = remote_ids.last().cloned();

    let mut contacts = Vec::with_capacity(records.len());
    for record in records {
        contacts.push(prefer_fresher(ctx, record.contact).await);
    }

    if !has_more {
        let orphans = load_orphans(ctx, request, membership, &remote_ids).await;
        contacts.extend(orphans);
    }

    let contacts: Vec<Contact> = contacts
        .into_iter()
        .filter(|contact| {
            request.filter.matches(contact)
                && request.filter.matches_status(membership, &contact.id)
        })
        .collect();
    let total =
        PageTotal::for_cursor_page(request.page, request.page_size, contacts.len(), has_more);

    Ok(ViewPage {
        contacts,
        page: request.page,
        total,
        has_more,
        last_id,
        remote_ids,
        match_meta: Default::default(),
    })
}

/// Cached copy unless the remote record was updated more recently
async fn prefer_fresher(ctx: &FetchContext, remote: Contact) -> Contact {
    let mut caches = ctx.caches.lock().await;
    match caches.details.get(CacheRegion::ContactDetail, &remote.id) {
        Some(cached) if !is_newer(&remote, &cached) => cached,
        Some(_) => {
            caches
                .details
                .insert(CacheRegion::ContactDetail, remote.id.clone(), remote.clone());
            remote
        }
        None => remote,
    }
}

fn is_newer(candidate: &Contact, current: &Contact) -> bool {
    match (candidate.updated_at, current.updated_at) {
        (Some(candidate), Some(current)) => candidate > current,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Members absent from every remote page of this cursor generation
async fn load_orphans(
    ctx: &FetchContext,
    request: &CampaignRequest,
    membership: &MembershipMap,
    remote_ids: &[String],
) -> Vec<Contact> {
    let on_page: HashSet<&str> = remote_ids.iter().map(String::as_str).collect();
    let mut missing: Vec<&str> = membership
        .member_ids()
        .into_iter()
        .filter(|id| !on_page.contains(id) && !request.seen_remote_ids.contains(*id))
        .collect();
    missing.sort_unstable();

    let mut orphans = Vec::with_capacity(missing.len());
    for id in missing {
        let cached = {
            let mut caches = ctx.caches.lock().await;
            caches.details.get(CacheRegion::ContactDetail, id)
        };
        if let Some(contact) = cached {
            orphans.push(contact);
            continue;
        }

        match ctx.sources.contacts.get_contact(id).await {
            Ok(contact) => {
                let mut caches = ctx.caches.lock().await;
                caches
                    .details
                    .insert(CacheRegion::ContactDetail, id, contact.clone());
                orphans.push(contact);
            }
            Err(e) => {
                warn!(contact_id = %id, error = %e, "Skipping campaign member that could not be loaded");
            }
        }
    }

    debug!(orphans = orphans.len(), "Campaign members appended to terminal page");
    sort_orphans(&mut orphans, request, membership);
    orphans
}

fn sort_orphans(orphans: &mut [Contact], request: &CampaignRequest, membership: &MembershipMap) {
    orphans.sort_by(|a, b| {
        let ordering = match request.order_by {
            CampaignSortField::Stage => request
                .stage_order
                .compare(membership.status_of(&a.id), membership.status_of(&b.id)),
            CampaignSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let ordering = match request.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        match ordering {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        }
    });
}
