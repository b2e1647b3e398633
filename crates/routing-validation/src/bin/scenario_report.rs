//! Runs every registered scenario and prints a `scenario,status,detail` CSV
//! to stdout, one row per scenario, exiting non-zero if any failed.

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn main() {
    println!("scenario,status,detail");
    let mut any_failed = false;
    for (name, run) in routing_validation::scenarios::all() {
        let (status, detail) = match run() {
            Ok(outcome) => ("pass", outcome.detail),
            Err(e) => {
                any_failed = true;
                ("fail", e)
            }
        };
        println!("{},{},{}", csv_escape(name), status, csv_escape(&detail));
    }
    if any_failed {
        std::process::exit(1);
    }
}
