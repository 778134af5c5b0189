use crate::config::SiteProfile;
use crate::error::ScrapeResult;
use crate::locator::{LocateOptions, locate_and_read, read_all_present, read_present};
use crate::navigation::DetailLink;
use crate::normalize::RawTitle;
use crate::session::PageSession;

/// Read every field of the loaded detail page
///
/// The name is required and waited for; once it is present the page is
/// considered rendered and the remaining fields are read without waiting.
pub(crate) async fn extract_detail<S: PageSession>(
    session: &mut S,
    site: &SiteProfile,
    link: &DetailLink,
    options: &LocateOptions,
) -> ScrapeResult<RawTitle> {
    let name = locate_and_read(session, &site.name, options).await?;
    let genres = read_all_present(session, &site.genres).await?;
    let ratings = read_all_present(session, &site.rating).await?;
    let vote_count = read_present(session, &site.vote_count).await?;
    let duration = read_present(session, &site.duration).await?;

    Ok(RawTitle {
        source_url: link.url.clone(),
        id: link.id.clone(),
        name: Some(name),
        genres,
        ratings,
        vote_count,
        duration,
    })
}
