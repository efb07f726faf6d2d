use std::{
    env,
    io::BufRead,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use strsim::levenshtein;

use crate::cli::{
    args::ArgList,
    output::{self, money},
    table::{Table, TableColumn},
    CliError, GlobalOptions,
};
use crate::config::{Config, ConfigManager};
use crate::core::{
    validation::{
        parse_date, parse_margin, parse_quantity, parse_rate, parse_stock, require_identity,
    },
    CatalogManager, Clock, FixedClock, RateChangeOutcome, RateSweepScheduler, SystemClock,
};
use crate::errors::LedgerError;
use crate::ledger::{
    same_product_name, Bill, Checkout, Party, Payment, PriceTier, Product, ProductEntry,
    ProductKey, PurchaseLine, PurchaseReceipt, RateEdit, SalesReceipt,
};
use crate::storage::{BillCounter, CsvCatalogStore, RateScheduleStore, RecordStore, SweepReport};

const COMMANDS: &[&str] = &[
    "list",
    "add-product",
    "purchase",
    "purchases",
    "payment",
    "sell",
    "unsell",
    "bill",
    "finish",
    "stock",
    "rate",
    "current-rate",
    "pending",
    "sweep",
    "watch",
    "backups",
    "restore",
    "delete",
    "config",
    "shell",
    "version",
    "help",
    "exit",
];

const HELP: &str = "\
Usage: billing_core_cli [--data-dir <path>] [--today <date>] <command> [options]

Catalog
  list                                   Show every product with rates and stock
  add-product --brand B --name N --rate R [--margin1 M] [--wholesale W]
              [--margin2 M] [--retail R] [--opening N] [--purchased N] [--date D]
                                         Add a product or overwrite an existing one
  stock --brand B --name N               Show the stock counters of one product
  delete --brand B --name N              Remove a product from the catalog

Purchases and sales
  purchase --item \"Brand,Name,Qty,Rate\" [--item ...] [--supplier S] [--phone P]
           [--place P] [--site S] [--payment TYPE] [--paid AMOUNT] [--date D] [--bill NO]
  purchases                              List recorded purchase bills
  sell --brand B --name N --qty Q [--tier retail|wholesale]
  unsell <line>                          Remove a line from the current bill
  bill                                   Show the current bill
  finish [--no-gst] [--customer C] [--phone P] [--place P] [--site S]
         [--type retail|wholesale] [--payment TYPE] [--paid AMOUNT]
                                         Number the current bill and save it
  payment --customer C [--cash A] [--cheque A] [--bank A] [--date D]
                                         Record money received from a customer

Rates
  rate --name N --rate R [--effective D] [--margin1 M] [--wholesale W] [--margin2 M] [--retail R]
  current-rate --name N [--on D]         Rates in force on a date
  pending                                Scheduled rate changes
  sweep                                  Apply rate changes that are due
  watch [--ticks N] [--interval SECS]    Keep sweeping on a fixed interval

Maintenance
  backups                                List catalog backups
  restore <backup-name>                  Replace the catalog with a backup
  config                                 Show the active configuration
  shell                                  Read commands from stdin, one per line
  version                                Show build information

Dates are YYYY-MM-DD or DD/MM/YYYY. An unfinished bill is closed when the
command or shell session ends.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

pub fn print_help() {
    println!("{HELP}");
}

/// One CLI run: the catalog manager plus the side stores it does not own.
pub struct Session {
    manager: CatalogManager,
    config: Config,
    config_path: PathBuf,
    catalog: CsvCatalogStore,
    sales: BillCounter,
    purchases: BillCounter,
    records: RecordStore,
}

impl Session {
    pub fn open(options: &GlobalOptions) -> Result<Self, CliError> {
        let configs = ConfigManager::new()?;
        let mut config = configs.load()?;
        if let Some(dir) = &options.data_dir {
            config.data_dir = absolute(dir)?;
        }
        let data_dir = configs.data_dir(&config)?;

        let catalog = CsvCatalogStore::new(data_dir.join(&config.catalog_file))
            .with_retention(config.backup_retention);
        let schedule = RateScheduleStore::new(data_dir.join(&config.schedule_file));
        let clock: Box<dyn Clock> = match options.today {
            Some(today) => Box::new(FixedClock::new(today)),
            None => Box::new(SystemClock),
        };
        let (manager, report) = CatalogManager::open(Box::new(catalog.clone()), schedule, clock)?;
        report_sweep(&report, false);

        Ok(Self {
            manager,
            sales: BillCounter::sales(data_dir.join(&config.bill_counter_file)),
            purchases: BillCounter::purchases(data_dir.join(&config.purchase_counter_file)),
            records: RecordStore::new(data_dir.join(&config.records_dir)),
            config_path: configs.path().to_path_buf(),
            catalog,
            config,
        })
    }

    pub fn manager(&self) -> &CatalogManager {
        &self.manager
    }

    pub fn dispatch<S: AsRef<str>>(
        &mut self,
        command: &str,
        tokens: &[S],
    ) -> Result<LoopControl, CliError> {
        let args = ArgList::parse(tokens);
        match command {
            "list" => self.list(),
            "add-product" => self.add_product(&args),
            "purchase" => self.purchase(&args),
            "purchases" => self.list_purchases(),
            "payment" => self.payment(&args),
            "sell" => self.sell(&args),
            "unsell" => self.unsell(&args),
            "bill" => {
                print_bill(self.manager.bill(), true, self.config.gst_percent);
                Ok(())
            }
            "finish" => {
                let checkout = self.checkout(&args)?;
                self.finish(checkout)
            }
            "stock" => self.stock(&args),
            "rate" => self.rate(&args),
            "current-rate" => self.current_rate(&args),
            "pending" => self.pending(),
            "sweep" => {
                let report = self.manager.sweep_due()?;
                report_sweep(&report, true);
                Ok(())
            }
            "watch" => self.watch(&args),
            "backups" => self.backups(),
            "restore" => self.restore(&args),
            "delete" => self.delete(&args),
            "config" => self.show_config(),
            "help" => {
                print_help();
                Ok(())
            }
            "version" => {
                println!("{}", crate::utils::build_info::current().summary());
                Ok(())
            }
            "exit" | "quit" => return Ok(LoopControl::Exit),
            "shell" => Err(CliError::Command("already running a shell".into())),
            other => Err(unknown_command(other)),
        }?;
        Ok(LoopControl::Continue)
    }

    /// Runs one command per input line. Failing commands are reported and the
    /// script carries on.
    pub fn run_script<R: BufRead>(&mut self, input: R) -> Result<(), CliError> {
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let tokens = match shell_words::split(trimmed) {
                Ok(tokens) => tokens,
                Err(err) => {
                    output::warning(format!("Could not parse `{trimmed}`: {err}"));
                    continue;
                }
            };
            let Some((command, rest)) = tokens.split_first() else {
                continue;
            };
            match self.dispatch(&command.to_ascii_lowercase(), rest) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Exit) => break,
                Err(err) => output::error(err),
            }
        }
        Ok(())
    }

    /// Closes any bill still open at the end of the run.
    pub fn close(mut self) -> Result<(), CliError> {
        if self.manager.bill().is_empty() {
            return Ok(());
        }
        let checkout = Checkout {
            gst_percent: self.config.gst_percent,
            ..Checkout::default()
        };
        self.finish(checkout)
    }

    fn list(&self) -> Result<(), CliError> {
        let products = self.manager.products();
        if products.is_empty() {
            output::info("No products in the catalog.");
            return Ok(());
        }
        let mut table = Table::new(vec![
            TableColumn::left("Brand"),
            TableColumn::left("Product"),
            TableColumn::right("Purchase"),
            TableColumn::right("M1 %"),
            TableColumn::right("Wholesale"),
            TableColumn::right("M2 %"),
            TableColumn::right("Retail"),
            TableColumn::right("Opening"),
            TableColumn::right("Purchased"),
            TableColumn::right("Sold"),
            TableColumn::right("Closing"),
            TableColumn::left("Modified"),
        ]);
        for product in products {
            table.push(vec![
                product.brand.clone(),
                product.product_name.clone(),
                money(product.purchase_rate),
                money(product.margin1),
                money(product.wholesale_rate),
                money(product.margin2),
                money(product.retail_rate),
                product.opening_stock.to_string(),
                product.purchased_stock.to_string(),
                product.sold_stock.to_string(),
                product.closing_stock.to_string(),
                product.modified_date.to_string(),
            ]);
        }
        println!("{}", table.render());
        Ok(())
    }

    fn add_product(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&[
            "brand", "name", "rate", "margin1", "wholesale", "margin2", "retail", "opening",
            "purchased", "date",
        ])?;
        let brand = args.required("brand")?;
        let name = args.required("name")?;
        require_identity(brand, name)?;
        let existing = self.manager.product(&ProductKey::new(brand, name)).cloned();

        let manual_wholesale = match args.value("wholesale") {
            Some(raw) => parse_rate(raw)?,
            None => existing.as_ref().map_or(0.0, |product| product.wholesale_rate),
        };
        let manual_retail = match args.value("retail") {
            Some(raw) => parse_rate(raw)?,
            None => existing.as_ref().map_or(0.0, |product| product.retail_rate),
        };
        // Opening stock carries over from the previous closing stock.
        let opening_stock = match args.value("opening") {
            Some(raw) => parse_stock(raw)?,
            None => existing
                .as_ref()
                .map_or(0, |product| product.closing_stock.max(0)),
        };
        let purchase_date = match args.value("date") {
            Some(raw) => parse_date(raw)?,
            None => self.manager.today(),
        };

        let outcome = self.manager.upsert_product(ProductEntry {
            brand: brand.to_string(),
            product_name: name.to_string(),
            purchase_date,
            purchase_rate: parse_rate(args.required("rate")?)?,
            margin1: parse_margin(args.value("margin1").unwrap_or(""))?,
            manual_wholesale,
            margin2: parse_margin(args.value("margin2").unwrap_or(""))?,
            manual_retail,
            opening_stock,
            purchased_stock: parse_stock(args.value("purchased").unwrap_or(""))?,
        })?;
        let stock = outcome.stock();
        let verb = if outcome.is_created() { "Added" } else { "Updated" };
        output::success(format!(
            "{verb} {} {}: opening {}, purchased {}, closing {}",
            brand.trim(),
            name.trim(),
            stock.opening,
            stock.purchased,
            stock.closing
        ));
        Ok(())
    }

    fn purchase(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&[
            "item", "supplier", "phone", "place", "site", "payment", "paid", "date", "bill",
        ])?;
        let items = args.values("item");
        if items.is_empty() {
            return Err(CliError::Input(
                "at least one `--item \"Brand,Name,Qty,Rate\"` is required".into(),
            ));
        }
        let lines = items
            .into_iter()
            .map(parse_purchase_item)
            .collect::<Result<Vec<_>, _>>()?;
        let date = match args.value("date") {
            Some(raw) => parse_date(raw)?,
            None => self.manager.today(),
        };
        let receipt = PurchaseReceipt {
            bill_no: args.value("bill").unwrap_or("").trim().to_string(),
            date,
            supplier: party(args, "supplier"),
            payment: payment(args)?,
            lines,
        };
        let counter = match args.value("bill") {
            Some(_) => None,
            None => Some(&self.purchases),
        };

        let (receipt, summary) = self
            .manager
            .record_purchase(receipt, counter, &self.records)?;
        for name in &summary.unmatched {
            output::warning(format!("Skipped `{name}`: not in the catalog"));
        }
        output::success(format!(
            "Purchase {} recorded: {} line(s), total {}",
            receipt.bill_no,
            summary.matched.len(),
            money(summary.total)
        ));
        Ok(())
    }

    fn sell(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["brand", "name", "qty", "tier"])?;
        let key = self.product_key(args)?;
        let quantity = parse_quantity(args.required("qty")?)?;
        let tier = match args.value("tier") {
            Some(raw) => raw.parse::<PriceTier>().map_err(CliError::Input)?,
            None => PriceTier::Retail,
        };
        let line = self.manager.add_sale_line(&key, quantity, tier)?;
        output::success(format!(
            "Line {}: {} x {} @ {} ({}) = {}",
            self.manager.bill().lines.len(),
            line.quantity,
            line.product_name,
            money(line.rate),
            line.tier,
            money(line.amount)
        ));
        Ok(())
    }

    fn unsell(&mut self, args: &ArgList) -> Result<(), CliError> {
        let raw = args
            .positional(0)
            .ok_or_else(|| CliError::Input("usage: unsell <line>".into()))?;
        let number = parse_count(raw, "line number")?;
        if number == 0 {
            return Err(CliError::Input("line numbers start at 1".into()));
        }
        let line = self.manager.delete_sale_line(number - 1)?;
        output::success(format!(
            "Removed line {number}: {} x {}",
            line.quantity, line.product_name
        ));
        Ok(())
    }

    fn list_purchases(&self) -> Result<(), CliError> {
        let purchases = self.records.load_purchases()?;
        if purchases.is_empty() {
            output::info("No purchases recorded.");
            return Ok(());
        }
        let mut table = Table::new(vec![
            TableColumn::left("Bill No"),
            TableColumn::left("Date"),
            TableColumn::left("Supplier"),
            TableColumn::left("Payment"),
            TableColumn::right("Items"),
            TableColumn::right("Total"),
            TableColumn::right("Paid"),
            TableColumn::right("Remaining"),
        ]);
        for purchase in purchases {
            table.push(vec![
                purchase.bill_no,
                purchase.date,
                purchase.supplier,
                purchase.payment_type,
                purchase.items_count.to_string(),
                purchase.total,
                purchase.paid,
                purchase.remaining,
            ]);
        }
        println!("{}", table.render());
        Ok(())
    }

    fn payment(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["customer", "cash", "cheque", "bank", "date"])?;
        let amount = |name: &str| -> Result<f64, LedgerError> {
            args.value(name).map_or(Ok(0.0), parse_rate)
        };
        let receipt = SalesReceipt {
            date: match args.value("date") {
                Some(raw) => parse_date(raw)?,
                None => self.manager.today(),
            },
            customer: args.required("customer")?.trim().to_string(),
            cash: amount("cash")?,
            cheque: amount("cheque")?,
            bank_transfer: amount("bank")?,
        };
        let record = self.records.append_sales_receipt(&receipt)?;
        output::success(format!(
            "Received {} from {} on {}",
            record.amount_received, record.customer, record.date
        ));
        Ok(())
    }

    fn checkout(&self, args: &ArgList) -> Result<Checkout, CliError> {
        args.ensure_known(&[
            "no-gst", "customer", "phone", "place", "site", "type", "payment", "paid",
        ])?;
        let customer_type = match args.value("type") {
            Some(raw) => raw.parse::<PriceTier>().map_err(CliError::Input)?,
            None => PriceTier::Retail,
        };
        Ok(Checkout {
            customer: party(args, "customer"),
            customer_type,
            payment: payment(args)?,
            include_gst: !args.has("no-gst"),
            gst_percent: self.config.gst_percent,
        })
    }

    fn finish(&mut self, checkout: Checkout) -> Result<(), CliError> {
        let bill = self
            .manager
            .finish_bill(&self.sales, &self.records, &checkout)?;
        print_bill(&bill, checkout.include_gst, checkout.gst_percent);
        if checkout.payment.amount_paid > 0.0 {
            println!("Paid: {}", money(checkout.payment.amount_paid));
            println!("Remaining: {}", money(checkout.remaining(&bill)));
        }
        let number = bill.number.as_deref().unwrap_or("-");
        output::success(format!(
            "Bill {number} saved to {}",
            self.records.bill_path(number).display()
        ));
        Ok(())
    }

    fn stock(&self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["brand", "name"])?;
        let key = self.product_key(args)?;
        let stock = self.manager.stock_of(&key)?;
        println!(
            "Opening: {}  Purchased: {}  Sold: {}  Closing: {}",
            stock.opening, stock.purchased, stock.sold, stock.closing
        );
        Ok(())
    }

    fn rate(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&[
            "name", "rate", "effective", "margin1", "wholesale", "margin2", "retail",
        ])?;
        let product = self.product_by_name(args.required("name")?)?;
        let today = self.manager.today();
        let effective_date = match args.value("effective") {
            Some(raw) => parse_date(raw)?,
            None => today.succ_opt().unwrap_or(today),
        };
        let margin1 = match args.value("margin1") {
            Some(raw) => parse_margin(raw)?,
            None => product.margin1,
        };
        let margin2 = match args.value("margin2") {
            Some(raw) => parse_margin(raw)?,
            None => product.margin2,
        };
        let manual_wholesale = match args.value("wholesale") {
            Some(raw) => parse_rate(raw)?,
            None => product.wholesale_rate,
        };
        let manual_retail = match args.value("retail") {
            Some(raw) => parse_rate(raw)?,
            None => product.retail_rate,
        };

        let outcome = self.manager.change_rate(RateEdit {
            product_name: product.product_name.clone(),
            new_purchase_rate: parse_rate(args.required("rate")?)?,
            effective_date,
            margin1,
            manual_wholesale,
            margin2,
            manual_retail,
        })?;
        match outcome {
            RateChangeOutcome::Applied(quote) => output::success(format!(
                "Rates for {} updated: purchase {}, wholesale {}, retail {}",
                product.product_name,
                money(quote.purchase_rate),
                money(quote.wholesale_rate),
                money(quote.retail_rate)
            )),
            RateChangeOutcome::Scheduled(change) => output::success(format!(
                "Rate change for {} scheduled from {}: purchase {}, wholesale {}, retail {}",
                change.product_name,
                change.effective_date,
                money(change.new_purchase_rate),
                money(change.wholesale_rate),
                money(change.retail_rate)
            )),
        }
        Ok(())
    }

    fn current_rate(&self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["name", "on"])?;
        let name = args.required("name")?;
        let on = match args.value("on") {
            Some(raw) => parse_date(raw)?,
            None => self.manager.today(),
        };
        let quote = self.manager.current_rate(name, on)?;
        println!(
            "{} on {}: purchase {}, wholesale {}, retail {}",
            name.trim(),
            on,
            money(quote.purchase_rate),
            money(quote.wholesale_rate),
            money(quote.retail_rate)
        );
        Ok(())
    }

    fn pending(&self) -> Result<(), CliError> {
        let pending = self.manager.pending_changes()?;
        if pending.is_empty() {
            output::info("No rate changes scheduled.");
            return Ok(());
        }
        let mut table = Table::new(vec![
            TableColumn::left("Product"),
            TableColumn::left("Effective"),
            TableColumn::right("Purchase"),
            TableColumn::right("M1 %"),
            TableColumn::right("Wholesale"),
            TableColumn::right("M2 %"),
            TableColumn::right("Retail"),
            TableColumn::left("Modified"),
        ]);
        for change in &pending {
            table.push(vec![
                change.product_name.clone(),
                change.effective_date.to_string(),
                money(change.new_purchase_rate),
                money(change.margin1),
                money(change.wholesale_rate),
                money(change.margin2),
                money(change.retail_rate),
                change.modified_date.to_string(),
            ]);
        }
        println!("{}", table.render());
        Ok(())
    }

    fn watch(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["ticks", "interval"])?;
        let interval = match args.value("interval") {
            Some(raw) => Duration::from_secs(parse_count(raw, "interval")?.max(1) as u64),
            None => self.config.sweep_interval(),
        };
        let ticks = args
            .value("ticks")
            .map(|raw| parse_count(raw, "tick count"))
            .transpose()?;

        let mut scheduler = RateSweepScheduler::new(interval);
        // The startup sweep already ran when the session opened.
        scheduler.mark_ran(Instant::now());
        output::info(format!(
            "Sweeping rate changes every {}s",
            interval.as_secs()
        ));
        let ran = scheduler.run(&mut self.manager, ticks);
        output::info(format!("Stopped after {ran} sweep(s)"));
        Ok(())
    }

    fn backups(&self) -> Result<(), CliError> {
        let backups = self.catalog.list_backups()?;
        if backups.is_empty() {
            output::info("No catalog backups yet.");
            return Ok(());
        }
        let mut table = Table::new(vec![TableColumn::left("Backup"), TableColumn::left("Created")]);
        for backup in backups {
            let created = backup
                .created_at
                .map(|stamp| stamp.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into());
            table.push(vec![backup.name, created]);
        }
        println!("{}", table.render());
        Ok(())
    }

    fn restore(&mut self, args: &ArgList) -> Result<(), CliError> {
        let name = args
            .positional(0)
            .ok_or_else(|| CliError::Input("usage: restore <backup-name>".into()))?;
        self.catalog.restore_backup(name, self.manager.today())?;
        let count = self.manager.reload()?;
        output::success(format!("Restored {name}: {count} product(s)"));
        Ok(())
    }

    fn delete(&mut self, args: &ArgList) -> Result<(), CliError> {
        args.ensure_known(&["brand", "name"])?;
        let key = self.product_key(args)?;
        let removed = self.manager.delete_product(&key)?;
        output::success(format!(
            "Deleted {} {}",
            removed.brand, removed.product_name
        ));
        Ok(())
    }

    fn show_config(&self) -> Result<(), CliError> {
        println!("# {}", self.config_path.display());
        println!("{}", serde_json::to_string_pretty(&self.config).map_err(LedgerError::from)?);
        Ok(())
    }

    fn product_key(&self, args: &ArgList) -> Result<ProductKey, CliError> {
        let brand = args.required("brand")?;
        let name = args.required("name")?;
        require_identity(brand, name)?;
        let key = ProductKey::new(brand, name);
        if self.manager.product(&key).is_none() {
            return Err(self.not_found(&key.to_string(), name));
        }
        Ok(key)
    }

    fn product_by_name(&self, name: &str) -> Result<Product, CliError> {
        self.manager
            .products()
            .iter()
            .find(|product| same_product_name(&product.product_name, name))
            .cloned()
            .ok_or_else(|| self.not_found(name.trim(), name))
    }

    fn not_found(&self, label: &str, name: &str) -> CliError {
        let needle = name.trim().to_lowercase();
        let suggestion = self
            .manager
            .products()
            .iter()
            .map(|product| {
                let distance = levenshtein(&product.product_name.to_lowercase(), &needle);
                (distance, product)
            })
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance);
        match suggestion {
            Some((_, product)) => CliError::Input(format!(
                "product `{label}` not found; did you mean {} {}?",
                product.brand, product.product_name
            )),
            None => LedgerError::ProductNotFound(label.to_string()).into(),
        }
    }
}

fn print_bill(bill: &Bill, include_gst: bool, gst_percent: f64) {
    let title = match &bill.number {
        Some(number) => format!("Bill {number}"),
        None => "Current bill".to_string(),
    };
    output::section(title);
    if bill.is_empty() {
        output::info("No items.");
        return;
    }
    let mut table = Table::new(vec![
        TableColumn::right("#"),
        TableColumn::left("Brand"),
        TableColumn::left("Product"),
        TableColumn::right("Qty"),
        TableColumn::left("Tier"),
        TableColumn::right("Rate"),
        TableColumn::right("Amount"),
    ]);
    for (index, line) in bill.lines.iter().enumerate() {
        table.push(vec![
            (index + 1).to_string(),
            line.brand.clone(),
            line.product_name.clone(),
            line.quantity.to_string(),
            line.tier.to_string(),
            money(line.rate),
            money(line.amount),
        ]);
    }
    println!("{}", table.render());
    println!("Subtotal: {}", money(bill.subtotal()));
    if include_gst {
        println!("GST ({gst_percent}%): {}", money(bill.gst_amount(gst_percent)));
    }
    println!("Total: {}", money(bill.total(include_gst, gst_percent)));
}

fn report_sweep(report: &SweepReport, verbose: bool) {
    for name in &report.applied {
        output::success(format!("Applied scheduled rate change for {name}"));
    }
    for name in &report.orphaned {
        output::warning(format!(
            "Discarded rate change for `{name}`: product no longer exists"
        ));
    }
    if verbose && report.is_noop() {
        output::info(format!(
            "No rate changes due ({} pending)",
            report.remaining
        ));
    }
}

/// Party details from `--<name_flag>`, `--phone`, `--place` and `--site`.
fn party(args: &ArgList, name_flag: &str) -> Party {
    let text = |flag: &str| args.value(flag).unwrap_or("").trim().to_string();
    Party {
        name: text(name_flag),
        phone: text("phone"),
        place: text("place"),
        site: text("site"),
    }
}

fn payment(args: &ArgList) -> Result<Payment, CliError> {
    let mut payment = Payment::default();
    if let Some(kind) = args.value("payment").map(str::trim).filter(|kind| !kind.is_empty()) {
        payment.payment_type = kind.to_string();
    }
    if let Some(raw) = args.value("paid") {
        payment.amount_paid = parse_rate(raw)?;
    }
    Ok(payment)
}

fn parse_purchase_item(raw: &str) -> Result<PurchaseLine, CliError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [brand, name, quantity, rate] = parts[..] else {
        return Err(CliError::Input(format!(
            "purchase item `{raw}` must look like Brand,Name,Qty,Rate"
        )));
    };
    require_identity(brand, name)?;
    Ok(PurchaseLine {
        brand: brand.to_string(),
        product_name: name.to_string(),
        quantity: parse_quantity(quantity)?,
        rate: parse_rate(rate)?,
    })
}

fn parse_count(raw: &str, what: &str) -> Result<usize, CliError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| CliError::Input(format!("invalid {what} `{}`", raw.trim())))
}

fn unknown_command(input: &str) -> CliError {
    let suggestion = COMMANDS
        .iter()
        .map(|name| (levenshtein(name, input), *name))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance);
    match suggestion {
        Some((_, best)) => {
            CliError::Input(format!("unknown command `{input}`; did you mean `{best}`?"))
        }
        None => CliError::Input(format!("unknown command `{input}`; try `help`")),
    }
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_items_need_four_fields() {
        let line = parse_purchase_item("Acme, Bulb, 5, 95.50").unwrap();
        assert_eq!(line.product_name, "Bulb");
        assert_eq!(line.quantity, 5);
        assert_eq!(line.rate, 95.5);
        assert!(parse_purchase_item("Acme,Bulb,5").is_err());
        assert!(parse_purchase_item("Acme,Bulb,0,10").is_err());
    }

    #[test]
    fn unknown_commands_get_a_suggestion() {
        let err = unknown_command("lsit");
        assert!(err.to_string().contains("did you mean `list`"));
        let err = unknown_command("frobnicate");
        assert!(err.to_string().contains("try `help`"));
    }
}
