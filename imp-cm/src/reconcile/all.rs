//! All-contacts view: listing or filtered search, never both

use imp_common::contact::Contact;
use imp_common::{Error, MembershipMap, Result};
use tracing::debug;

use super::{AllContactsRequest, FetchContext, ViewPage};
use crate::pagination::{PageCursor, PageTotal};
use crate::sources::ContactsQuery;

pub(super) async fn reconcile_all(
    ctx: &FetchContext,
    request: &AllContactsRequest,
    membership: &MembershipMap,
) -> Result<ViewPage> {
    if request.cursor == PageCursor::Undefined {
        debug!(page = request.page, "Cursor undefined, serving empty page");
        let total = PageTotal::for_cursor_page(request.page, request.page_size, 0, false);
        return Ok(ViewPage::empty(request.page, total));
    }

    let start_after = request.cursor.start_after().map(str::to_string);
    let (contacts, has_more, total) = if request.filter.has_remote_criteria() {
        fetch_filtered(ctx, request, start_after).await?
    } else {
        fetch_listing(ctx, request, start_after).await?
    };

    let remote_ids: Vec<String> = contacts.iter().map(|c| c.id.clone()).collect();
    let last_id = remote_ids.last().cloned();
    let contacts = contacts
        .into_iter()
        .filter(|contact| request.filter.matches_status(membership, &contact.id))
        .collect();

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

async fn fetch_listing(
    ctx: &FetchContext,
    request: &AllContactsRequest,
    start_after: Option<String>,
) -> Result<(Vec<Contact>, bool, PageTotal)> {
    let query = ContactsQuery {
        limit: request.page_size,
        start_after,
        order_by: request.order_by,
        direction: request.direction,
    };
    let key = format!(
        "{}|{}|{}|{}",
        query.limit,
        query.start_after.as_deref().unwrap_or(""),
        query.order_by.as_str(),
        query.direction.as_str()
    );

    let page = ctx
        .cached(key, || ctx.sources.contacts.list_contacts(&query))
        .await?;
    let has_more = page.pagination.has_more;
    let total =
        PageTotal::for_cursor_page(request.page, request.page_size, page.data.len(), has_more);
    Ok((page.data, has_more, total))
}

async fn fetch_filtered(
    ctx: &FetchContext,
    request: &AllContactsRequest,
    start_after: Option<String>,
) -> Result<(Vec<Contact>, bool, PageTotal)> {
    let body = request.filter.to_request(
        request.page_size,
        start_after,
        request.order_by,
        request.direction,
    );
    let key = serde_json::to_string(&body).map_err(|e| Error::InvalidInput(e.to_string()))?;

    let page = ctx
        .cached(key, || ctx.sources.contacts.filter_contacts(&body))
        .await?;

    let seen = request.page * request.page_size + page.data.len();
    let (has_more, total) = match page.total {
        Some(total) => {
            let total = (total as usize).max(seen);
            (seen < total, total)
        }
        // No count reported: a full page may have a successor
        None => (page.data.len() >= request.page_size, seen),
    };
    Ok((page.data, has_more, PageTotal::Exact(total)))
}
