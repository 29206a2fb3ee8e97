use crate::catalog::identity::listing_key;

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// A saved marketplace search with an acceptable price band `[price_low, price_high]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub id: i64,
    pub url: String,
    pub search_term: String,
    pub search_type: String,
    pub price_low: u32,
    pub price_high: u32,
}

/// Input for creating a watch. The band is validated by the repository.
#[derive(Debug, Clone)]
pub struct NewWatch {
    pub url: String,
    pub search_term: String,
    pub search_type: String,
    pub price_low: u32,
    pub price_high: u32,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Identity key derived from the normalized listing URL.
    pub key: String,
    pub watch_id: i64,
    pub title: String,
    /// Free-form price text as shown on the marketplace ("75 € VB", "Zu verschenken", ...).
    pub raw_price: String,
    pub url: String,
}

impl Listing {
    pub fn new(
        watch_id: i64,
        url: impl Into<String>,
        title: impl Into<String>,
        raw_price: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            key: listing_key(&url),
            watch_id,
            title: title.into(),
            raw_price: raw_price.into(),
            url,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog delta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// First time this identity is seen for the watch.
    New,
    /// Known identity whose raw price text differs from the stored one.
    PriceChanged { previous_price: String },
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::New => write!(f, "new"),
            ChangeKind::PriceChanged { .. } => write!(f, "price_changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingChange {
    pub listing: Listing,
    pub kind: ChangeKind,
}

// ---------------------------------------------------------------------------
// Price classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceHint {
    /// Negotiable and at most 10% over the band.
    AboveNegotiable,
    /// Up to 30% below the band.
    BelowBand,
}

impl std::fmt::Display for PriceHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceHint::AboveNegotiable => write!(f, "+10%"),
            PriceHint::BelowBand => write!(f, "-30%"),
        }
    }
}

/// Which classification rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePosition {
    /// No digits in the price text.
    Unpriced,
    /// Symbolic price of 1 outside the band.
    Placeholder,
    InBand,
    NegotiableAbove,
    BelowBand,
    OutOfRange,
}

impl std::fmt::Display for PricePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PricePosition::Unpriced => "unpriced",
            PricePosition::Placeholder => "placeholder",
            PricePosition::InBand => "in_band",
            PricePosition::NegotiableAbove => "negotiable_above",
            PricePosition::BelowBand => "below_band",
            PricePosition::OutOfRange => "out_of_range",
        };
        write!(f, "{s}")
    }
}

/// Derived per run from a listing and its watch's band. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceClassification {
    pub worth_messaging: bool,
    pub position: PricePosition,
    /// Human-readable band marker, e.g. `X < 50€ [.....X....] 100€`.
    pub price_range: Option<String>,
    pub price_hint: Option<PriceHint>,
}
