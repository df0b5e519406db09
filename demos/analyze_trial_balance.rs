use trial_balance_analyzer::{analyze_files, AnalysisConfig, UploadedFile};

fn main() {
    let fy23 = "Account Head,Type,Amount\n\
                Sales,Income,-840000\n\
                Rent,Expense,180000\n\
                Salaries,Expense,310000\n\
                Power,Expense,42000\n\
                Cash,Asset,220000\n\
                Bank Loan,Liability,150000\n";

    let fy24 = "Account Head,Type,Amount\n\
                Sales,Income,\"-9,60,000\"\n\
                Rent,Expense,\"1,95,000\"\n\
                Salaries,Expense,\"3,40,000\"\n\
                Power,Expense,\"51,000\"\n\
                Marketing,Expense,\"64,000\"\n\
                Cash,Asset,\"2,75,000\"\n\
                Bank Loan,Liability,\"1,20,000\"\n";

    let files = vec![
        UploadedFile::new("trial_balance_fy23.csv", "2022-2023", fy23),
        UploadedFile::new("trial_balance_fy24.csv", "2023-2024", fy24),
    ];

    let config = AnalysisConfig {
        income_is_negative: true,
        ..Default::default()
    }
    .with_threshold("Rent", 0.3)
    .with_threshold("Salaries", 0.5)
    .with_threshold("Marketing", 0.1);

    let report = analyze_files(&files, &config).expect("config should be valid");

    for failure in &report.failures {
        println!("Excluded {}: {}", failure.file, failure.message);
    }

    println!("{}", report.to_markdown());

    for (period, totals) in &report.year_over_year {
        println!(
            "{}: income {:.2}, expense {:.2}",
            period, totals.income, totals.expense
        );
    }
}
