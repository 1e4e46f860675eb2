use crate::campaigns::CampaignId;
use thiserror::Error;

/// Everything that can go wrong in the market model and its analysis
#[derive(Debug, Error)]
pub enum Error {
    // Precondition violations
    #[error("a good needs at least one non-empty market segment")]
    EmptySegments,
    #[error("reserve price must be finite and non-negative, got {0}")]
    InvalidReservePrice(f64),
    #[error("campaign {campaign} must have a positive reach")]
    InvalidReach { campaign: CampaignId },
    #[error("campaign {campaign} must have a finite positive budget, got {budget}")]
    InvalidBudget { campaign: CampaignId, budget: f64 },
    #[error("invalid bid from campaign {campaign}: amount {amount}, limit {limit} (need 0 <= amount <= limit, limit > 0)")]
    InvalidBid {
        campaign: CampaignId,
        amount: f64,
        limit: f64,
    },
    #[error("effective reach ratio is undefined for a zero reach")]
    ZeroReach,
    #[error("campaign {0} appears more than once")]
    DuplicateCampaign(CampaignId),
    #[error("good {0} appears more than once in the catalog")]
    DuplicateGood(String),
    #[error("campaign {0} is not part of the market")]
    UnknownCampaign(CampaignId),
    #[error("good {0} is not part of the catalog")]
    UnknownGood(String),
    #[error("allocation and expenditure ledgers describe different markets")]
    LedgerMismatch,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Infeasibility
    #[error("pricing linear program is infeasible")]
    PricingInfeasible,
    #[error("pricing linear program is unbounded")]
    PricingUnbounded,
    #[error("epsilon must be finite and non-negative, got {0}")]
    InvalidEpsilon(f64),
    #[error("profile table is empty")]
    EmptyProfileTable,
    #[error("profile ({num_we} WE, {num_wf} WF) does not sum to {n} players")]
    InconsistentProfile {
        num_we: usize,
        num_wf: usize,
        n: usize,
    },
    #[error("profile table has no row for ({num_we} WE, {num_wf} WF)")]
    MissingProfile { num_we: usize, num_wf: usize },
    #[error("{got} revenues for {expected} profiles")]
    RevenueLengthMismatch { got: usize, expected: usize },
    #[error("cannot aggregate an empty equilibrium family")]
    EmptyFamily,
    #[error("member {0} of the equilibrium family has no nodes")]
    EmptyFamilyMember(usize),
    #[error("unknown reducer '{0}' (expected min, mean or max)")]
    UnknownReducer(String),
    #[error("unknown aggregator '{0}' (expected outer-inner, e.g. min-min)")]
    UnknownAggregator(String),
    #[error("unknown equilibrium kind '{0}' (expected scc or sink)")]
    UnknownEquilibriumKind(String),
    #[error("malformed equilibrium report: {0}")]
    MalformedReport(String),

    // Collaborators
    #[error(transparent)]
    Sampling(#[from] sampler::SamplerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
