//! hawk.live scraper: stažení stránky se živými sériemi a extrakce draftů.
//!
//! `acquire` řeší síť (přímý fetch, proxy, headless Chrome), `extract` už
//! jen parsuje text, takže jde testovat bez sítě.

pub mod acquire;
pub mod extract;

pub use acquire::{
    AcquireError, Acquirer, Acquisition, BrowserFetch, DirectFetch, FallbackSettings, FetchAttempt,
    FetchOutcome, FetchStrategy, ProxyFetch, DEFAULT_CANDIDATE_URLS, DEFAULT_PROXY_ENDPOINT,
};
pub use extract::{extract, page_state, ExtractOptions, Extraction, ExtractionFailure, ExtractionPath, ParseError};
