pub mod health;
pub mod top_creators;

pub use health::health_check;
pub use top_creators::{
    calculate_top_creators, get_all_top_creators, get_category_top_creators, get_ranking_status,
};
