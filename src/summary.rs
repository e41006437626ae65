use std::collections::BTreeMap;

use crate::metadata::SampleTable;

/// Genome counts by sampling year.
#[derive(Debug, Clone)]
pub struct YearSummary {
    counts: BTreeMap<i32, usize>,
}

/// Counts on either side of a cutoff year (inclusive on the early side).
#[derive(Debug, Clone, Copy)]
pub struct CutoffSplit {
    pub through: usize,
    pub after: usize,
}

impl CutoffSplit {
    pub fn total(&self) -> usize {
        self.through + self.after
    }

    pub fn through_pct(&self) -> f64 {
        percentage(self.through, self.total())
    }

    pub fn after_pct(&self) -> f64 {
        percentage(self.after, self.total())
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl YearSummary {
    pub fn from_table(table: &SampleTable) -> Self {
        let mut counts = BTreeMap::new();
        for record in &table.records {
            if let Some(year) = record.year() {
                *counts.entry(year).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        let first = *self.counts.keys().next()?;
        let last = *self.counts.keys().next_back()?;
        Some((first, last))
    }

    pub fn counts(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.counts.iter().map(|(&year, &count)| (year, count))
    }

    pub fn split_at(&self, cutoff: i32) -> CutoffSplit {
        let through = self
            .counts
            .iter()
            .filter(|(&year, _)| year <= cutoff)
            .map(|(_, &count)| count)
            .sum();
        CutoffSplit {
            through,
            after: self.total() - through,
        }
    }

    pub fn breakdown_after(&self, cutoff: i32) -> Vec<(i32, usize)> {
        self.counts()
            .filter(|&(year, _)| year > cutoff)
            .collect()
    }

    /// Top `n` years by count; ties resolve to the earlier year.
    pub fn peak_years(&self, n: usize) -> Vec<(i32, usize)> {
        let mut years: Vec<(i32, usize)> = self.counts().collect();
        years.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        years.truncate(n);
        years
    }

    /// Print the cutoff report to stdout.
    pub fn print_report(&self, cutoff: i32) {
        println!("Summary statistics");
        if self.is_empty() {
            println!("  no rows with year data");
            return;
        }
        println!("  genomes with year data: {}", self.total());

        if let Some((first, last)) = self.year_range() {
            println!("  year range: {first} to {last}");
        }

        let split = self.split_at(cutoff);
        println!(
            "  <={cutoff}: {} ({:.1}%)",
            split.through,
            split.through_pct()
        );
        println!("  >{cutoff}: {} ({:.1}%)", split.after, split.after_pct());

        let breakdown = self.breakdown_after(cutoff);
        if !breakdown.is_empty() {
            println!("  post-{cutoff} breakdown:");
            for (year, count) in &breakdown {
                println!("    {year}: {count} genomes");
            }
        }

        if let Some((first, _)) = self.year_range() {
            let span = (cutoff - first + 1).max(1) as f64;
            println!(
                "  average through {cutoff}: {:.1} genomes/year",
                split.through as f64 / span
            );
            if !breakdown.is_empty() {
                println!(
                    "  average after {cutoff}: {:.1} genomes/year",
                    split.after as f64 / breakdown.len() as f64
                );
            }
        }

        println!("  peak years:");
        for (year, count) in self.peak_years(5) {
            println!("    {year}: {count} genomes");
        }
    }
}
