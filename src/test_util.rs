#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    let old_base = std::env::var(crate::paths::BASE_DIR_ENV).ok();
    // SAFETY: guarded by HOME_MUTEX; tests touching these variables hold it.
    unsafe {
        std::env::set_var("HOME", dir.path());
        std::env::remove_var(crate::paths::BASE_DIR_ENV);
    }
    let result = func(dir.path());
    unsafe {
        match old_home {
            Some(old) => std::env::set_var("HOME", old),
            None => std::env::remove_var("HOME"),
        }
        if let Some(old) = old_base {
            std::env::set_var(crate::paths::BASE_DIR_ENV, old);
        }
    }
    result
}

/// Raw bytes of an installed sans-serif face, if the machine has one.
#[cfg(test)]
pub(crate) fn system_font_data() -> Option<Vec<u8>> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    let families = [usvg::fontdb::Family::SansSerif];
    let query = usvg::fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query).or_else(|| db.faces().next().map(|face| face.id))?;
    db.with_face_data(id, |data, _index| data.to_vec())
}

#[cfg(test)]
pub(crate) fn system_font() -> Option<crate::render::FontFace> {
    let data = system_font_data();
    if data.is_none() {
        eprintln!("skipping: no system font available");
    }
    crate::render::FontFace::from_data(data?).ok()
}
