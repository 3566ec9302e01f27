//! Site Adapters - 漫画站点客户端实现

mod fake_site;
mod readmanga;

pub use fake_site::FakeSiteAdapter;
pub use readmanga::*;
