pub mod data_client;
pub mod gamma_client;
pub mod price_client;
pub mod types;

pub use data_client::{DataClient, DataClientError, MAX_PAGE_SIZE};
pub use gamma_client::{GammaClient, GammaClientError, GammaMarket};
pub use price_client::{PriceClient, PriceClientError};
pub use types::{ApiAccountSummary, ApiFill, ApiPosition, ApiPriceHistory};
