//! Built-in pixel art, used when the asset directory has no image manifest.

use lattice_engine::canvas::ImageError;
use lattice_engine::{rgb, AssetError, IndexedImage, MemoryImageSource, TRANSPARENT};

pub(crate) const IMAGE_NAMES: &[&str] = &[
    "player",
    "monster",
    "coin",
    "statue",
    "title",
    "press_fire",
    "game_over",
];

const GLYPH_WIDTH: usize = 3;
const GLYPH_HEIGHT: usize = 5;
const GLYPH_ADVANCE: usize = GLYPH_WIDTH + 1;

const PLAYER: &[&str] = &[
    "..hhh..", "..fff..", "..fef..", "...f...", ".bbbbb.", "b.bbb.b", "..bbb..", "..l.l..",
    "..l.l..", ".ll.ll.",
];

const MONSTER: &[&str] = &[
    "..ggg..", ".ggggg.", "gwgggwg", "gkgggkg", "ggggggg", "g.g.g.g", "g.g.g.g",
];

const COIN: &[&str] = &[".yyy.", "yyoyy", "yyoyy", "yyoyy", ".yyy."];

const STATUE: &[&str] = &[
    "..sss..", ".sssss.", ".sdsds.", "..sss..", "...s...", ".sssss.", "s.sss.s", "s.sss.s",
    "..sss..", "..s.s..", "..s.s..", ".dddddd", "ddddddd", "ddddddd",
];

pub(crate) fn builtin_images() -> Result<MemoryImageSource, AssetError> {
    let mut source = MemoryImageSource::new();
    let skin = rgb(3, 2, 1);
    let white = rgb(3, 3, 3);
    let black = rgb(0, 0, 0);

    insert(
        &mut source,
        "player",
        IndexedImage::from_rows(
            PLAYER,
            &[
                ('h', rgb(2, 1, 0)),
                ('f', skin),
                ('e', black),
                ('b', rgb(0, 1, 3)),
                ('l', rgb(1, 1, 1)),
            ],
            (3, 9),
        ),
    )?;
    insert(
        &mut source,
        "monster",
        IndexedImage::from_rows(
            MONSTER,
            &[('g', rgb(0, 2, 0)), ('w', white), ('k', black)],
            (3, 6),
        ),
    )?;
    insert(
        &mut source,
        "coin",
        IndexedImage::from_rows(COIN, &[('y', rgb(3, 3, 0)), ('o', rgb(2, 2, 0))], (2, 4)),
    )?;
    insert(
        &mut source,
        "statue",
        IndexedImage::from_rows(STATUE, &[('s', rgb(2, 2, 2)), ('d', rgb(1, 1, 1))], (3, 13)),
    )?;
    insert(&mut source, "title", text_image("LATTICE", rgb(3, 3, 0), 3))?;
    insert(&mut source, "press_fire", text_image("PRESS FIRE", white, 1))?;
    insert(&mut source, "game_over", text_image("GAME OVER", rgb(3, 0, 0), 2))?;
    Ok(source)
}

fn insert(
    source: &mut MemoryImageSource,
    name: &str,
    image: Result<IndexedImage, ImageError>,
) -> Result<(), AssetError> {
    let image = image.map_err(|source| AssetError::Image {
        name: name.to_string(),
        source,
    })?;
    source.insert(name, image)
}

/// Renders `text` in the 3x5 block font, magnified by `scale`. The reference
/// point is the top centre. Characters without a glyph render as blanks.
pub(crate) fn text_image(text: &str, colour: u8, scale: u32) -> Result<IndexedImage, ImageError> {
    let scale = scale.max(1) as usize;
    let chars = text.chars().count();
    let width = (chars * GLYPH_ADVANCE).saturating_sub(1) * scale;
    let height = GLYPH_HEIGHT * scale;
    let mut pixels = vec![TRANSPARENT; width * height];

    for (index, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        for (gy, row) in rows.iter().enumerate() {
            for (gx, mark) in row.bytes().enumerate() {
                if mark != b'#' {
                    continue;
                }
                let left = (index * GLYPH_ADVANCE + gx) * scale;
                let top = gy * scale;
                for y in top..top + scale {
                    let start = y * width + left;
                    pixels[start..start + scale].fill(colour);
                }
            }
        }
    }

    IndexedImage::new(
        width as u32,
        height as u32,
        pixels,
        ((width / 2) as i32, 0),
    )
}

fn glyph(ch: char) -> Option<[&'static str; GLYPH_HEIGHT]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [".#.", "#.#", "###", "#.#", "#.#"],
        'C' => ["###", "#..", "#..", "#..", "###"],
        'E' => ["###", "#..", "##.", "#..", "###"],
        'F' => ["###", "#..", "##.", "#..", "#.."],
        'G' => ["###", "#..", "#.#", "#.#", "###"],
        'I' => ["###", ".#.", ".#.", ".#.", "###"],
        'L' => ["#..", "#..", "#..", "#..", "###"],
        'M' => ["#.#", "###", "###", "#.#", "#.#"],
        'O' | '0' => ["###", "#.#", "#.#", "#.#", "###"],
        'P' => ["###", "#.#", "###", "#..", "#.."],
        'R' => ["##.", "#.#", "##.", "#.#", "#.#"],
        'S' | '5' => ["###", "#..", "###", "..#", "###"],
        'T' => ["###", ".#.", ".#.", ".#.", ".#."],
        'V' => ["#.#", "#.#", "#.#", "#.#", ".#."],
        '1' => [".#.", "##.", ".#.", ".#.", "###"],
        '2' => ["###", "..#", "###", "#..", "###"],
        '3' => ["###", "..#", ".##", "..#", "###"],
        '4' => ["#.#", "#.#", "###", "..#", "..#"],
        '6' => ["###", "#..", "###", "#.#", "###"],
        '7' => ["###", "..#", "..#", ".#.", ".#."],
        '8' => ["###", "#.#", "###", "#.#", "###"],
        '9' => ["###", "#.#", "###", "..#", "###"],
        _ => return None,
    };
    Some(rows)
}
