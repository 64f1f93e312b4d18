//! Headless walkthrough: shapes a few frames of text and reports what the
//! caches did.
//!
//! Usage: `textcat [FONT_ROOT] [FAMILY] [TEXT]`, where `FONT_ROOT/fonts/FAMILY.ttf`
//! exists. With the `utils` feature the atlas is written to `atlas.png`.

use textcat::{OutlineType, TextConfig, TextShapeCache, TextStyle};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let family = args.next().unwrap_or_else(|| "DejaVuSans".to_string());
    let text = args.next().unwrap_or_else(|| "Hello, textcat!\nSecond line".to_string());

    let config = TextConfig::from_env().with_font_root(&root);
    let mut cache = TextShapeCache::new(&config);

    let body = TextStyle::new(family.as_str(), 24.0)
        .with_background([0.1, 0.1, 0.1, 1.0])
        .with_underline([1.0, 0.8, 0.2, 1.0]);
    let outlined = TextStyle::new(family.as_str(), 24.0).with_outline(OutlineType::Outer, 1.0);

    for frame in 0..4 {
        let counter = format!("frame {frame}");
        for (style, s) in [(&body, text.as_str()), (&body, counter.as_str()), (&outlined, text.as_str())] {
            let shaped = cache.get(style, s)?;
            let pen = shaped.pen();
            println!(
                "frame {frame}: {:?} -> {} vertices, {} indices, pen ({}, {}), serial {}",
                s,
                shaped.buffer().vertex_count(),
                shaped.buffer().index_count(),
                pen.x,
                pen.y,
                shaped.serial()
            );
        }
        cache.advance_frame();
    }

    let width = cache.text_width(&body, &text)?;
    let (columns, rows) = cache.char_grid(&body, 800.0, 600.0)?;
    println!("width of {text:?}: {width}px, 800x600 grid: {columns}x{rows}");
    println!(
        "shaped {} times, evicted {}, {} entries live, {} fonts, {} atlas texels used",
        cache.shape_count(),
        cache.evicted_count(),
        cache.len(),
        cache.fonts().len(),
        cache.fonts().atlas().used()
    );

    #[cfg(feature = "utils")]
    {
        cache.fonts().atlas().save_png("atlas.png")?;
        println!("atlas written to atlas.png");
    }

    Ok(())
}
