#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use glyphloom_core::GlyphBounds;

    use crate::fixture::{FixtureFont, FixtureLoader};
    use crate::{
        AtlasCache, AtlasConfig, AtlasError, CosmicFontLoader, FontAtlas, FontDescriptor, FontLoader,
    };

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.0001
    }

    /// Advance 6, ascent 8, descent 2: line height 10, ink 4x7 per glyph.
    fn font() -> FixtureFont {
        FixtureFont::monospace(6.0, 8.0, 2.0)
    }

    fn narrow_config() -> AtlasConfig {
        AtlasConfig {
            texture_width: 64,
            ..AtlasConfig::default()
        }
    }

    fn atlas_with(font: FixtureFont, config: &AtlasConfig) -> FontAtlas {
        init_logging();
        FontAtlas::new(1, FontDescriptor::new("fixture", 12.0), Box::new(font), config)
            .expect("fixture atlas")
    }

    fn assert_no_ink_overlap(atlas: &FontAtlas) {
        let rects: Vec<_> = atlas.placements().map(|(ch, p)| (ch, p.ink_rect())).collect();
        for (i, (a, ra)) in rects.iter().enumerate() {
            for (b, rb) in &rects[i + 1..] {
                assert!(!ra.intersects(rb), "{a:?} {ra:?} overlaps {b:?} {rb:?}");
            }
        }
    }

    // ──────────────────────────────────────────
    // Creation and pre-seed
    // ──────────────────────────────────────────

    #[test]
    fn test_new_atlas_preseeds_printable_ascii() {
        let atlas = atlas_with(font(), &AtlasConfig::default());
        assert_eq!(atlas.glyph_count(), 95);
        for ch in ' '..='~' {
            assert!(atlas.has_placement(ch), "{ch:?} not pre-seeded");
        }
        assert_eq!(atlas.line_height(), 10.0);
        assert_eq!(atlas.ascent(), 8.0);
        assert_eq!(atlas.total_width(), 2048.0);
        assert_eq!(atlas.total_height(), 10.0);
        assert_eq!(atlas.cursor(), (570.0, 0.0));
        assert_eq!(atlas.texture().generation(), 1);
    }

    #[test]
    fn test_placement_uses_whole_pixel_metrics() {
        let atlas = atlas_with(font(), &AtlasConfig::default());
        let p = atlas.placement('!').unwrap();
        assert_eq!((p.x, p.y), (7.0, 1.0));
        assert_eq!((p.width, p.height), (4.0, 7.0));
        assert_eq!((p.left_bearing, p.right_bearing), (1.0, 1.0));
        assert_eq!(p.offset_y, 1.0);
        assert_eq!(p.advance(), 6.0);

        let space = atlas.placement(' ').unwrap();
        assert_eq!(space.width, 0.0);
        assert_eq!(space.right_bearing, 6.0);
        assert_eq!(space.offset_y, 8.0);
    }

    #[test]
    fn test_blitted_pixels_match_placement() {
        let atlas = atlas_with(font(), &AtlasConfig::default());
        let image = atlas.image();
        assert_eq!(image.get_pixel(7, 1).0[0], 255);
        assert_eq!(image.get_pixel(10, 7).0[0], 255);
        assert_eq!(image.get_pixel(6, 1).0[0], 0);
        assert_eq!(image.get_pixel(11, 1).0[0], 0);
        assert_eq!(image.get_pixel(7, 0).0[0], 0);
    }

    #[test]
    fn test_uv_is_normalized_by_current_extents() {
        let atlas = atlas_with(font(), &AtlasConfig::default());
        let (min, max) = atlas.uv('!').unwrap();
        assert!(approx_eq(min[0], 7.0 / 2048.0));
        assert!(approx_eq(min[1], 0.1));
        assert!(approx_eq(max[0], 11.0 / 2048.0));
        assert!(approx_eq(max[1], 0.8));
        assert!(atlas.uv('€').is_none());
    }

    #[test]
    fn test_zero_line_height_is_unavailable() {
        init_logging();
        let result = FontAtlas::new(
            1,
            FontDescriptor::new("broken", 12.0),
            Box::new(FixtureFont::empty(0.0, 0.0)),
            &AtlasConfig::default(),
        );
        assert!(matches!(result, Err(AtlasError::ResourceUnavailable { .. })));
    }

    // ──────────────────────────────────────────
    // ensure
    // ──────────────────────────────────────────

    #[test]
    fn test_ensure_known_text_changes_nothing() {
        let mut atlas = atlas_with(font(), &AtlasConfig::default());
        let before = atlas.texture();
        let outcome = atlas.ensure("Hello, world!").unwrap();
        assert!(!outcome.changed());
        assert_eq!(outcome.placed, 0);
        assert_eq!(atlas.texture(), before);
    }

    #[test]
    fn test_ensure_new_glyph_bumps_generation() {
        let mut atlas = atlas_with(font().with_glyph('é', GlyphBounds::blank(6.0)), &AtlasConfig::default());
        let before = atlas.texture().generation();
        let outcome = atlas.ensure("café").unwrap();
        assert_eq!(outcome.placed, 1);
        assert!(atlas.has_placement('é'));
        assert_eq!(atlas.texture().generation(), before + 1);
        assert_eq!(atlas.cursor(), (576.0, 0.0));
    }

    #[test]
    fn test_ensure_deduplicates_within_call() {
        let glyph = GlyphBounds {
            min_x: 1.0,
            min_y: -7.0,
            max_x: 5.0,
            max_y: 0.0,
            advance: 6.0,
        };
        let mut atlas = atlas_with(font().with_glyph('ß', glyph), &AtlasConfig::default());
        let outcome = atlas.ensure("ßßß").unwrap();
        assert_eq!(outcome.placed, 1);
        assert_eq!(atlas.glyph_count(), 96);
    }

    #[test]
    fn test_missing_glyph_is_remembered_not_fatal() {
        let mut atlas = atlas_with(font(), &AtlasConfig::default());
        let before = atlas.texture();

        let outcome = atlas.ensure("a€b").unwrap();
        assert_eq!(outcome.placed, 0);
        assert_eq!(outcome.missing, 1);
        assert!(atlas.is_missing('€'));
        assert!(!atlas.has_placement('€'));
        assert_eq!(atlas.texture(), before);

        // Second time the font is not asked again.
        let outcome = atlas.ensure("€").unwrap();
        assert_eq!(outcome.missing, 0);
    }

    #[test]
    fn test_control_characters_are_never_packed() {
        let mut atlas = atlas_with(font(), &AtlasConfig::default());
        let outcome = atlas.ensure("a\nb\tc\r").unwrap();
        assert_eq!(outcome, Default::default());
        assert!(!atlas.has_placement('\n'));
        assert!(!atlas.is_missing('\n'));
    }

    #[test]
    fn test_glyph_without_preseed_on_empty_range() {
        let config = AtlasConfig {
            preseed_first: 'b',
            preseed_last: 'a',
            ..AtlasConfig::default()
        };
        let mut atlas = atlas_with(font(), &config);
        assert_eq!(atlas.glyph_count(), 0);
        assert_eq!(atlas.texture().generation(), 0);

        atlas.ensure("!").unwrap();
        let p = atlas.placement('!').unwrap();
        assert_eq!((p.x, p.y), (1.0, 1.0));
    }

    // ──────────────────────────────────────────
    // Packing
    // ──────────────────────────────────────────

    #[test]
    fn test_narrow_atlas_wraps_rows_without_overlap() {
        let atlas = atlas_with(font(), &narrow_config());
        // Ten glyphs per 64px row, 95 glyphs.
        assert_eq!(atlas.total_height(), 100.0);
        assert_eq!(atlas.image().height(), 100);
        assert_eq!(atlas.image().width(), 64);
        assert_eq!(atlas.cursor(), (30.0, 90.0));

        let p = atlas.placement('*').unwrap();
        assert_eq!((p.x, p.y), (1.0, 11.0));

        for (_, p) in atlas.placements() {
            assert!(p.x + p.width <= 64.0);
            assert!(p.y + p.height <= atlas.total_height());
        }
        assert_no_ink_overlap(&atlas);
    }

    #[test]
    fn test_height_grows_monotonically_width_fixed() {
        let config = AtlasConfig {
            preseed_first: ' ',
            preseed_last: ' ',
            ..narrow_config()
        };
        let mut atlas = atlas_with(font(), &config);
        let mut last_height = atlas.total_height();
        let text: String = ('!'..='~').collect();
        for chunk in text.as_bytes().chunks(7) {
            let chunk = std::str::from_utf8(chunk).unwrap();
            atlas.ensure(chunk).unwrap();
            assert!(atlas.total_height() >= last_height);
            assert_eq!(atlas.total_width(), 64.0);
            assert_eq!(atlas.image().height() as f32, atlas.total_height());
            last_height = atlas.total_height();
        }
        assert_eq!(last_height, 100.0);
        assert_no_ink_overlap(&atlas);
    }

    #[test]
    fn test_growth_preserves_existing_pixels() {
        let config = AtlasConfig {
            preseed_first: ' ',
            preseed_last: '!',
            ..narrow_config()
        };
        let mut atlas = atlas_with(font(), &config);
        assert_eq!(atlas.image().get_pixel(7, 1).0[0], 255);
        let before = atlas.total_height();

        let rest: String = ('"'..='~').collect();
        atlas.ensure(&rest).unwrap();
        assert!(atlas.total_height() > before);
        assert_eq!(atlas.image().get_pixel(7, 1).0[0], 255);
        assert_eq!(atlas.image().get_pixel(6, 1).0[0], 0);
    }

    #[test]
    fn test_negative_left_bearing_does_not_overlap_neighbours() {
        let j = GlyphBounds {
            min_x: -2.0,
            min_y: -7.0,
            max_x: 3.0,
            max_y: 2.0,
            advance: 4.0,
        };
        let atlas = atlas_with(font().with_glyph('j', j), &AtlasConfig::default());

        let i = atlas.placement('i').unwrap();
        let pj = atlas.placement('j').unwrap();
        let k = atlas.placement('k').unwrap();
        assert_eq!(pj.left_bearing, -2.0);
        assert_eq!(pj.width, 5.0);
        assert_eq!(pj.height, 9.0);
        assert!(pj.x >= i.x + i.width);
        assert!(k.x >= pj.x + pj.width);
        assert!(pj.y + pj.height <= atlas.total_height());
        assert_no_ink_overlap(&atlas);
    }

    /// Ink 4x11 rising three pixels above the ascent of `font()`.
    fn tall_glyph() -> GlyphBounds {
        GlyphBounds {
            min_x: 1.0,
            min_y: -11.0,
            max_x: 5.0,
            max_y: 0.0,
            advance: 6.0,
        }
    }

    #[test]
    fn test_tall_glyph_stays_clear_of_previous_row() {
        let mut atlas = atlas_with(font().with_glyph('Å', tall_glyph()), &narrow_config());
        atlas.ensure("Å").unwrap();

        let p = atlas.placement('Å').unwrap();
        assert_eq!(p.offset_y, -3.0);
        assert_eq!(p.height, 11.0);
        // Previous row ink ends at y = 88.
        assert_eq!((p.x, p.y), (31.0, 88.0));
        assert!(p.y + p.height <= atlas.total_height());
        assert_eq!(atlas.total_height(), 100.0);
        assert_eq!(atlas.image().get_pixel(31, 88).0[0], 255);
        assert_eq!(atlas.image().get_pixel(31, 98).0[0], 255);
        assert_no_ink_overlap(&atlas);
    }

    #[test]
    fn test_tall_glyph_on_first_row_grows_atlas() {
        let config = AtlasConfig {
            preseed_first: ' ',
            preseed_last: ' ',
            ..narrow_config()
        };
        let mut atlas = atlas_with(font().with_glyph('Å', tall_glyph()), &config);
        atlas.ensure("Å").unwrap();

        let p = *atlas.placement('Å').unwrap();
        assert_eq!((p.x, p.y), (7.0, 0.0));
        assert_eq!(atlas.total_height(), 11.0);
        assert_eq!(atlas.image().height(), 11);
        assert_eq!(atlas.image().get_pixel(7, 0).0[0], 255);
        assert_eq!(atlas.image().get_pixel(7, 10).0[0], 255);

        let (min, max) = atlas.uv('Å').unwrap();
        assert!(min[1] >= 0.0);
        assert!(approx_eq(max[1], 1.0));

        // The next row starts below the tall ink.
        atlas.ensure(&('!'..='~').collect::<String>()).unwrap();
        assert_no_ink_overlap(&atlas);
        for (_, p) in atlas.placements() {
            assert!(p.y >= 0.0);
            assert!(p.y + p.height <= atlas.total_height());
        }
    }

    #[test]
    fn test_overflow_leaves_atlas_untouched() {
        let mut font = font();
        for ch in 'À'..='Å' {
            font = font.with_glyph(
                ch,
                GlyphBounds {
                    min_x: 1.0,
                    min_y: -7.0,
                    max_x: 5.0,
                    max_y: 0.0,
                    advance: 6.0,
                },
            );
        }
        let config = AtlasConfig {
            max_texture_height: 100,
            ..narrow_config()
        };
        let mut atlas = atlas_with(font, &config);
        let texture = atlas.texture();
        let count = atlas.glyph_count();

        // Five slots remain on the last row; the sixth glyph needs another row.
        let err = atlas.ensure("ÀÁÂÃÄÅ").unwrap_err();
        match err {
            AtlasError::AtlasOverflow { required, limit, .. } => {
                assert_eq!(required, 110);
                assert_eq!(limit, 100);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(atlas.texture(), texture);
        assert_eq!(atlas.glyph_count(), count);
        assert_eq!(atlas.total_height(), 100.0);
        assert_eq!(atlas.cursor(), (30.0, 90.0));
        assert!(!atlas.has_placement('À'));

        let outcome = atlas.ensure("ÀÁÂÃÄ").unwrap();
        assert_eq!(outcome.placed, 5);
        assert_eq!(atlas.total_height(), 100.0);
    }

    #[test]
    fn test_glyph_wider_than_texture_overflows() {
        let wide = GlyphBounds {
            min_x: 0.0,
            min_y: -7.0,
            max_x: 80.0,
            max_y: 0.0,
            advance: 80.0,
        };
        let mut atlas = atlas_with(font().with_glyph('Ω', wide), &narrow_config());
        let texture = atlas.texture();
        assert!(matches!(atlas.ensure("Ω"), Err(AtlasError::AtlasOverflow { .. })));
        assert!(!atlas.has_placement('Ω'));
        assert_eq!(atlas.texture(), texture);
    }

    #[test]
    fn test_dropped_glyph_reports_missing() {
        let mut atlas = atlas_with(font().without_glyph('#'), &AtlasConfig::default());
        assert!(atlas.is_missing('#'));
        assert_eq!(atlas.glyph_count(), 94);
        assert_eq!(atlas.ensure("#").unwrap().missing, 0);
    }

    #[test]
    fn test_kerning_is_cached_in_whole_pixels() {
        let mut atlas = atlas_with(font().with_kerning('A', 'V', -1.5), &AtlasConfig::default());
        assert_eq!(atlas.kerning('A', 'V'), -1.0);
        assert_eq!(atlas.kerning('V', 'A'), 0.0);
        assert_eq!(atlas.kerning('A', 'V'), -1.0);
    }

    #[test]
    fn test_device_scale_is_recorded() {
        let atlas = atlas_with(font(), &AtlasConfig::default().with_device_scale(2.0));
        assert_eq!(atlas.scale(), 2.0);
    }

    #[test]
    fn test_save_png_writes_file() {
        let atlas = atlas_with(font(), &AtlasConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.png");
        atlas.save_png(&path).unwrap();
        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.width(), 2048);
        assert_eq!(reloaded.height(), 10);
    }

    // ──────────────────────────────────────────
    // Descriptor
    // ──────────────────────────────────────────

    #[test]
    fn test_descriptor_equality_is_exact() {
        let a = FontDescriptor::new("Mono.ttf", 12.0);
        assert_eq!(a, FontDescriptor::new("Mono.ttf", 12.0));
        assert_ne!(a, FontDescriptor::new("Mono.ttf", 12.5));
        assert_ne!(a, FontDescriptor::new("Sans.ttf", 12.0));

        let set: HashSet<_> = [a.clone(), FontDescriptor::new("Mono.ttf", 12.0)].into();
        assert_eq!(set.len(), 1);
        assert_eq!(a.to_string(), "Mono.ttf@12pt");
    }

    // ──────────────────────────────────────────
    // Cache
    // ──────────────────────────────────────────

    #[test]
    fn test_cache_returns_same_atlas_for_equal_descriptors() {
        init_logging();
        let loader = FixtureLoader::new(font());
        let loads = loader.load_counter();
        let cache = AtlasCache::new(loader, AtlasConfig::default());

        let a = cache.get_or_create(&FontDescriptor::new("mono", 12.0)).unwrap();
        let b = cache.get_or_create(&FontDescriptor::new("mono", 12.0)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_separates_sizes() {
        init_logging();
        let loader = FixtureLoader::new(font());
        let loads = loader.load_counter();
        let cache = AtlasCache::new(loader, AtlasConfig::default());

        let a = cache.get_or_create(&FontDescriptor::new("mono", 12.0)).unwrap();
        let b = cache.get_or_create(&FontDescriptor::new("mono", 14.0)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.lock().id(), b.lock().id());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.descriptors().len(), 2);
    }

    #[test]
    fn test_cache_propagates_load_failure() {
        init_logging();
        let loader = FixtureLoader::new(font()).failing("missing.ttf");
        let loads = loader.load_counter();
        let cache = AtlasCache::new(loader, AtlasConfig::default());
        let descriptor = FontDescriptor::new("missing.ttf", 12.0);

        let result = cache.get_or_create(&descriptor);
        assert!(matches!(result, Err(AtlasError::ResourceUnavailable { ref resource, .. }) if resource == "missing.ttf"));
        assert!(cache.is_empty());
        assert!(cache.get(&descriptor).is_none());

        // Nothing is cached for failures, so the next request tries again.
        assert!(cache.get_or_create(&descriptor).is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_applies_device_scale() {
        init_logging();
        let config = AtlasConfig::default().with_device_scale(2.0);
        let cache = AtlasCache::new(FixtureLoader::new(font()), config);
        let atlas = cache.get_or_create(&FontDescriptor::new("mono", 12.0)).unwrap();
        let atlas = atlas.lock();
        assert_eq!(atlas.line_height(), 20.0);
        assert_eq!(atlas.placement('!').unwrap().width, 8.0);
        assert_eq!(cache.device_scale(), 2.0);
    }

    #[test]
    fn test_cache_concurrent_requests_share_one_atlas() {
        init_logging();
        let loader = FixtureLoader::new(font());
        let loads = loader.load_counter();
        let cache = AtlasCache::new(loader, AtlasConfig::default());
        let descriptor = FontDescriptor::new("mono", 12.0);

        let atlases: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_create(&descriptor).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for atlas in &atlases[1..] {
            assert!(Arc::ptr_eq(&atlases[0], atlas));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    // ──────────────────────────────────────────
    // cosmic-text loader
    // ──────────────────────────────────────────

    fn unavailable_reason(result: crate::Result<crate::BoxedRasterizer>) -> String {
        match result {
            Err(AtlasError::ResourceUnavailable { reason, .. }) => reason,
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("loaded a font that should be unavailable"),
        }
    }

    #[test]
    fn test_cosmic_loader_missing_file_is_unavailable() {
        init_logging();
        let loader = CosmicFontLoader::new();
        let result = loader.load(&FontDescriptor::new("/nonexistent/glyphloom.ttf", 12.0), 1.0);
        assert!(!unavailable_reason(result).is_empty());
    }

    #[test]
    fn test_cosmic_loader_rejects_data_without_faces() {
        init_logging();
        let loader = CosmicFontLoader::new().with_font_data("junk", b"not a font".to_vec());
        let reason = unavailable_reason(loader.load(&FontDescriptor::new("junk", 12.0), 1.0));
        assert!(reason.contains("no font faces"), "{reason}");
    }

    #[test]
    fn test_cosmic_loader_failure_is_not_cached() {
        init_logging();
        let cache = AtlasCache::new(CosmicFontLoader::new(), AtlasConfig::default());
        let descriptor = FontDescriptor::new("/nonexistent/glyphloom.ttf", 12.0);
        assert!(matches!(
            cache.get_or_create(&descriptor),
            Err(AtlasError::ResourceUnavailable { .. })
        ));
        assert!(cache.is_empty());
    }

    // ──────────────────────────────────────────
    // Config
    // ──────────────────────────────────────────

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: AtlasConfig = serde_json::from_str(r#"{"texture_width": 512}"#).unwrap();
        assert_eq!(config.texture_width, 512);
        assert_eq!(config.max_texture_height, crate::DEFAULT_MAX_TEXTURE_HEIGHT);
        assert_eq!(config.preseed().count(), 95);
        assert_eq!(config.device_scale, 1.0);
    }

    #[test]
    fn test_config_save_and_load() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("atlas.json");
        let config = AtlasConfig {
            texture_width: 1024,
            preseed_first: 'a',
            preseed_last: 'z',
            ..AtlasConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AtlasConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_config_load_normalizes_bad_scale() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.json");
        std::fs::write(&path, r#"{"device_scale": -2.0, "texture_width": 0}"#).unwrap();
        let config = AtlasConfig::load(&path).unwrap();
        assert_eq!(config.device_scale, 1.0);
        assert_eq!(config.texture_width, crate::DEFAULT_TEXTURE_WIDTH);
    }

    #[test]
    fn test_config_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AtlasConfig::load(&path), Err(AtlasError::Config(_))));
        assert!(matches!(
            AtlasConfig::load(&dir.path().join("absent.json")),
            Err(AtlasError::Io(_))
        ));
    }
}
