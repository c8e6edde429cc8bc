mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

fn main() -> iced::Result {
    if let Err(e) = utils::logging::init() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    iced::application(app::DownloadApp::default, app::update, app::view)
        .title("Simple Video Downloader")
        .run()
}
