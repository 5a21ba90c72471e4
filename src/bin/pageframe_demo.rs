//! Terminal walkthrough of a paged shop GUI.
//!
//! ```bash
//! cargo run --bin pageframe_demo
//! PAGEFRAME_LOG=/tmp/pageframe.log cargo run --bin pageframe_demo
//! ```
//!
//! Arrow keys move the cursor, Enter clicks, Esc or `q` closes.

use pageframe::{
    CliDriver, EngineConfig, FileSink, GuiBuilder, Item, ItemEntry, Logger, Navigation, PageSpec,
    Setting,
};

const PRODUCTS: usize = 40;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::default();
    if let Ok(path) = std::env::var("PAGEFRAME_LOG") {
        config = config
            .with_logger(Logger::new(FileSink::new(path, 1024 * 1024)?))
            .with_debug(true);
        config.enable_metrics();
    }

    let mut gui = GuiBuilder::new(Setting::new(4, "Shop - page {page}")).with_config(config);
    gui.on_open(|ctx| {
        ctx.notify(format!("Welcome, {}!", ctx.viewer()));
        Ok(())
    });
    gui.set_item(
        ItemEntry::new(Item::labeled("info", "Help")).on_click(|ctx| {
            ctx.notify("Enter buys, arrows move, q leaves.");
            Ok(())
        }),
        4,
    );
    gui.add_page(PageSpec::auto(), |page| {
        page.add_items(products(), |item, ctx| {
            ctx.notify(format!("Bought {}.", item.display_name()));
            Ok(())
        })?;
        Ok(())
    });
    gui.on_page_open(|ctx| {
        ctx.notify(format!("Page {}", ctx.page()));
        Ok(())
    });
    gui.nav(Navigation::new().margin(1));

    CliDriver::new(gui.build()?, "player").run()?;
    Ok(())
}

fn products() -> Vec<Item> {
    (1..=PRODUCTS)
        .map(|n| {
            Item::labeled(format!("product-{n}"), format!("Item #{n}"))
                .with_lore(format!("{} coins", n * 5))
        })
        .collect()
}
