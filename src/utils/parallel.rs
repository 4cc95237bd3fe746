/// Parallel processing utilities

/// Threads to use for `requested` (0 = all cores)
pub fn effective_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

pub fn configure_thread_pool(threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(threads))
        .build_global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_threads() {
        assert_eq!(effective_threads(4), 4);
        assert!(effective_threads(0) >= 1);
    }
}
