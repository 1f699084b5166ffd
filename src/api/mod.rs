pub mod coingecko;
pub mod transport;

pub use coingecko::MarketDataClient;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
