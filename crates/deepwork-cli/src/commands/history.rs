use super::{open_service, print_json};

pub fn run() -> anyhow::Result<()> {
    let service = open_service()?;
    print_json(&service.history()?)
}
