use chrono::{DateTime, Utc};

/// Stats from an orchestrator run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub terms_total: u32,
    pub terms_cached: u32,
    pub terms_scraped: u32,
    pub terms_failed: u32,
    pub batches: u32,
    pub entries_saved: u32,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            terms_total: 0,
            terms_cached: 0,
            terms_scraped: 0,
            terms_failed: 0,
            batches: 0,
            entries_saved: 0,
        }
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = Utc::now() - self.started_at;
        writeln!(f, "\n=== Imenik Run Complete ===")?;
        writeln!(f, "Names:          {}", self.terms_total)?;
        writeln!(f, "From cache:     {}", self.terms_cached)?;
        writeln!(f, "Scraped:        {}", self.terms_scraped)?;
        writeln!(f, "Failed:         {}", self.terms_failed)?;
        writeln!(f, "Batches:        {}", self.batches)?;
        writeln!(f, "Entries saved:  {}", self.entries_saved)?;
        write!(f, "Elapsed:        {}s", elapsed.num_seconds())
    }
}
