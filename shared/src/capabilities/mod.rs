//! Capabilities the core talks to the shell through.
//!
//! Crux's built-in Render and Http are used as is; `Host` covers toasts,
//! navigation and the clock.

mod host;
mod http;

pub use self::host::{Host, HostOperation, HostOutput};
pub use self::http::ContactApi;

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;
pub type AppHost = host::HostCapability;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub host: Host<Event>,
}

impl Capabilities {
    pub fn http(&self) -> &AppHttp {
        &self.http
    }

    pub fn render(&self) -> &AppRender {
        &self.render
    }

    pub fn host(&self) -> &AppHost {
        &self.host
    }
}
