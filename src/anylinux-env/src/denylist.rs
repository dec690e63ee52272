//! Variables that leak the bundle's private search paths into host programs.

/// Environment variables removed from an external child's environment when
/// their value points into the bundle.
pub const LEAKY_ENV_VARS: &[&str] = &[
    // Image and graphics plugin loaders
    "BABL_PATH",
    "__EGL_VENDOR_LIBRARY_DIRS",
    "GBM_BACKENDS_PATH",
    "GCONV_PATH",
    "GDK_PIXBUF_MODULEDIR",
    "GDK_PIXBUF_MODULE_FILE",
    "GEGL_PATH",
    // GLib / GObject
    "GIO_MODULE_DIR",
    "GI_TYPELIB_PATH",
    "GSETTINGS_SCHEMA_DIR",
    // GStreamer
    "GST_PLUGIN_PATH",
    "GST_PLUGIN_SCANNER",
    "GST_PLUGIN_SYSTEM_PATH",
    "GST_PLUGIN_SYSTEM_PATH_1_0",
    // GTK
    "GTK_DATA_PREFIX",
    "GTK_EXE_PREFIX",
    "GTK_IM_MODULE_FILE",
    "GTK_PATH",
    "IMLIB2_FILTER_PATH",
    "IMLIB2_LOADER_PATH",
    // Audio
    "JACK_DRIVER_DIR",
    // Dynamic linker
    "LD_LIBRARY_PATH",
    "LD_PRELOAD",
    "LIBDECOR_PLUGIN_DIR",
    "LIBGL_DRIVERS_PATH",
    "LIBHEIF_PLUGIN_PATH",
    "LIBVA_DRIVERS_PATH",
    // libmagic / ImageMagick
    "MAGIC",
    "MAGICK_CODER_FILTER_PATH",
    "MAGICK_CODER_MODULE_PATH",
    "MAGICK_CONFIGURE_PATH",
    "MAGICK_HOME",
    // Interpreters
    "PERLLIB",
    "PIPEWIRE_MODULE_DIR",
    "PYTHONHOME",
    "QT_PLUGIN_PATH",
    "SPA_PLUGIN_DIR",
    "TCL_LIBRARY",
    // Locale
    "TEXTDOMAINDIR",
    "TK_LIBRARY",
    "XKB_CONFIG_ROOT",
    "XTABLES_LIBDIR",
];

/// Check if a variable name is on the leakage denylist.
pub fn is_leaky_env_var(name: &[u8]) -> bool {
    LEAKY_ENV_VARS.iter().any(|v| v.as_bytes() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_leaky_env_var() {
        assert!(is_leaky_env_var(b"LD_LIBRARY_PATH"));
        assert!(is_leaky_env_var(b"QT_PLUGIN_PATH"));
        assert!(is_leaky_env_var(b"TEXTDOMAINDIR"));
        assert!(!is_leaky_env_var(b"PATH"));
        assert!(!is_leaky_env_var(b"HOME"));
        assert!(!is_leaky_env_var(b"TERM"));
    }

    #[test]
    fn test_match_is_exact() {
        assert!(!is_leaky_env_var(b"LD_LIBRARY"));
        assert!(!is_leaky_env_var(b"LD_LIBRARY_PATH_EXTRA"));
        assert!(!is_leaky_env_var(b"ld_library_path"));
    }

    #[test]
    fn test_no_duplicates() {
        let mut names = LEAKY_ENV_VARS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LEAKY_ENV_VARS.len());
    }
}
